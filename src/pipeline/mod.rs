//! The per-item pipeline: normalize, validate, deduplicate

pub mod dedup;
pub mod normalize;
pub mod validate;

pub use dedup::{merge_records, Deduplicator, MergeOutcome};
pub use normalize::FieldNormalizer;
pub use validate::{RecordValidator, RejectReason, Rejection};
