mod client;
mod error;
mod wire;

pub use client::ApiClient;
pub use error::LoadError;
