//! Firestore REST adapter for the durable video record.
//!
//! This crate provides:
//! - A typed repository for video record documents
//! - Service account authentication via gcp_auth, with token caching
//! - Partial field-set updates (`updateMask`) and retry logic

pub mod client;
pub mod error;
pub mod retry;
pub mod token_cache;
pub mod types;
pub mod video_repo;

pub use client::{FirestoreClient, FirestoreConfig};
pub use error::{FirestoreError, FirestoreResult};
pub use types::{Document, ToFirestoreValue, Value};
pub use video_repo::VideoRepository;
