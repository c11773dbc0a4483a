use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;

use crate::eval::context::ExecutionContext;

use super::transport::Transport;
use super::types::{FragmentResponse, LoaderResult};

/// A stage of the loader pipeline.
///
/// An interceptor sees the request before everything registered after it
/// and the response after everything registered after it. It may call
/// `next` with the same or a substituted uri/context, call it several times,
/// not call it at all, or rewrite what it returns.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn handle(
        &self,
        uri: &Url,
        context: &ExecutionContext,
        next: Next<'_>,
    ) -> LoaderResult<FragmentResponse>;
}

/// The rest of the pipeline after the current interceptor.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    interceptors: &'a [Arc<dyn Interceptor>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    pub(crate) fn new(interceptors: &'a [Arc<dyn Interceptor>], transport: &'a dyn Transport) -> Self {
        Self {
            interceptors,
            transport,
        }
    }

    /// Number of interceptors still ahead of the terminal call.
    pub fn remaining(&self) -> usize {
        self.interceptors.len()
    }

    pub async fn run(self, uri: &Url, context: &ExecutionContext) -> LoaderResult<FragmentResponse> {
        match self.interceptors.split_first() {
            Some((interceptor, rest)) => {
                interceptor
                    .handle(uri, context, Next::new(rest, self.transport))
                    .await
            }
            None => self.transport.send(uri, context).await,
        }
    }
}
