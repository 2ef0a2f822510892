pub mod client;
pub mod error;

pub use client::{N8nClient, UpstreamResponse};
pub use error::UpstreamError;
