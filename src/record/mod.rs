//! Record model: raw candidates produced by parsers and canonical movie records

mod candidate;
mod movie;

pub use candidate::CandidateRecord;
pub use movie::{Extensions, MovieDraft, MovieRecord, RatingDistribution, RecordKey};
