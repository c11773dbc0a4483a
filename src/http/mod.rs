//! Fragment loading.
//!
//! [`HttpLoader`] runs every fetch through an ordered list of
//! [`Interceptor`]s wrapped around a terminal [`Transport`]:
//!
//! ```text
//! get(uri) → P1 → P2 → … → Pn → Transport::send
//!                                      │
//! result  ← P1 ← P2 ← … ← Pn ←─────────┘
//! ```
//!
//! The reqwest transport builds the request through a [`RequestFactory`] and
//! sends it with a client from a [`ClientFactory`]. Non-2xx responses become
//! [`LoaderError::RequestFailed`]; failures are reported to an [`ErrorSink`]
//! once and returned unchanged.

pub mod factory;
pub mod interceptor;
pub mod interceptors;
pub mod loader;
pub mod transport;
pub mod types;

pub use factory::{ClientFactory, DefaultRequestFactory, PooledClientFactory, RequestFactory};
pub use interceptor::{Interceptor, Next};
pub use loader::{ErrorSink, HttpLoader, HttpLoaderBuilder, TracingErrorSink};
pub use transport::{ReqwestTransport, Transport};
pub use types::{FragmentResponse, LoaderError, LoaderResult};
