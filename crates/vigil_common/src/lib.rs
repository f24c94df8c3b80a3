//! Vigil Common - shared types for the vigil telemetry daemon.
//!
//! Record model, HTTP response envelope, and the completion-provider
//! abstraction used by the summarization path.

pub mod llm_client;
pub mod record;
pub mod response;

pub use record::{Collection, NewRecord, RecordError, StoredRecord};
pub use response::ApiResponse;
