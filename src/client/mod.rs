//! HTTP implementation of the export backend

mod backend;
pub mod http;

pub use backend::HttpExportBackend;
pub use http::{ApiClient, HttpConfig};
