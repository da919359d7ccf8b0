// Integration API client and the request/response shapes it speaks.

mod client;
pub mod types;

pub use client::IntegrationClient;
