//! Names of structured log events, attached as the `event` field

pub const FETCH_ATTEMPT: &str = "fetch_attempt";
pub const FETCH_RETRY: &str = "fetch_retry";
pub const FETCH_FAILED: &str = "fetch_failed";
pub const VALIDATION_REJECTED: &str = "validation_rejected";
pub const PARSE_SKIPPED: &str = "parse_skipped";
pub const PAGE_FAILED: &str = "page_failed";
pub const CATEGORY_ABORTED: &str = "category_aborted";
pub const DUPLICATE_DROPPED: &str = "duplicate_dropped";
pub const PLATFORM_FAILED: &str = "platform_failed";
