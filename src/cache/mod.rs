// Cache module for persisted conditional-request metadata.
// Stores ETag/Last-Modified validators and response bodies keyed by request fingerprint.

pub mod store;

pub use store::{CacheEntry, CacheStore, fingerprint};
