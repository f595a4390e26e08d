pub mod client;

pub use client::{api_error_message, ApiClient, ApiError};
