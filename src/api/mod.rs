//! Remote resource client for the inventory backend.

pub mod client;
pub mod models;
pub mod transport;

pub use client::ApiClient;
pub use models::{Product, ProductFields};
pub use transport::{HttpTransport, Transport};
