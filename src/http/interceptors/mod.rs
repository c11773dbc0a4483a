//! Interceptors shipped with the loader.

mod retry;
mod rewrite;
mod timeout;

pub use retry::RetryInterceptor;
pub use rewrite::RewriteInterceptor;
pub use timeout::TimeoutInterceptor;
