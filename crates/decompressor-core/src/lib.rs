//! # decompressor-core
//!
//! Restores archived session recordings and re-emits them as clean,
//! de-duplicated JSON.
//!
//! - [`codec`] - compressed event blob <-> [`EventSet`]
//! - [`canonical`] - order-independent forms of URLs and JSON text
//! - [`dedupe`] - canonical keys and first-seen filtering of network events
//! - [`assembler`] - export envelope, pretty printing, file output
//! - [`pipeline`] - one archived file in, one envelope out
//! - [`batch`] - directory driver running the pipeline per file

pub mod assembler;
pub mod batch;
pub mod canonical;
pub mod codec;
pub mod dedupe;
mod error;
mod outcome;
pub mod pipeline;
mod types;

pub use assembler::{prettify, SerializedSession, SessionAssembler};
pub use batch::{discover_sessions, process_file, BatchConfig, BatchMode, BatchRunner};
pub use canonical::{normalize_json_text, normalize_url, sort_deep, Normalized};
pub use codec::BlobCodec;
pub use dedupe::{canonical_key_of, dedupe, DedupeStats, Deduplicator};
pub use error::{DecodeError, SessionError};
pub use outcome::{BatchSummary, FileOutcome};
pub use pipeline::{
    pack_session, process_session, ProcessOptions, ProcessedSession, SessionOutcome, SkipReason,
};
pub use types::{EventSet, Metadata, INTERACTION_CATEGORY, NETWORK_CATEGORY};
