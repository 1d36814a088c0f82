//! Backend adapter implementations.

pub mod http_backend;
pub mod mock_backend;

pub use http_backend::HttpBackend;
pub use mock_backend::{MockBackend, MockStep};
