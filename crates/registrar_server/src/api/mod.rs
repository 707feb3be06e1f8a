//! HTTP API building blocks shared by every route module.

pub mod error;
pub mod extract;
pub mod response;

pub use error::ApiError;
pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use response::{ApiResponse, ErrorResponse};
