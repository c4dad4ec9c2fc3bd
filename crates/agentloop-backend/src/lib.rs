//! The one interface the agent harnesses see: `Backend::generate`. Swapping
//! backends (mock, HTTP, local inference) never touches the harnesses.

pub mod mock;
pub mod port;

#[cfg(feature = "http")]
pub mod http;

pub use mock::MockBackend;
pub use port::{Backend, FinishReason, GenerateRequest, GenerateResponse};

#[cfg(feature = "http")]
pub use http::HttpBackend;
