//! Client for the capture appliance's `/api/v1` control API.

pub mod client;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod offline;
pub mod transport;
pub mod types;

pub use client::{ApiClient, ApiResponse};
pub use error::{FailureReason, RequestFailure};
pub use offline::CachingTransport;
pub use transport::{
    ApiRequest, HttpTransport, Method, RawResponse, Transport, TransportError,
};
