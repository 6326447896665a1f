//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - GoCardless HTTP client for CredentialProvider, ResourceFetcher and ConsentProvider
//! - Local directory, GCS and in-memory backends for BlobStorage
//! - Mock GoCardless server for testing

pub mod gocardless;
pub mod storage;

#[cfg(test)]
pub mod gocardless_mock;
