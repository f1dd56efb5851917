//! Typed client for the site backend.
//!
//! Every controller talks to the backend through [`ApiClient`]; none of them
//! build requests themselves.

pub mod client;
pub mod error;
pub mod models;

pub use client::{
    ApiClient, ApiClientBuilder, AuthClient, BlogsClient, FormsClient, PaymentsClient,
};
pub use error::{ApiError, ApiResult};
pub use models::*;
