//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod data_provider;
mod storage;

pub use data_provider::{AccessToken, ApiPath, ConsentProvider, CredentialProvider, ResourceFetcher};
pub use storage::BlobStorage;
