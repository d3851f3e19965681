//! State module for tracking crawl progress
//!
//! `CrawlState` is the state machine every category crawl walks through.

mod crawl_state;

pub use crawl_state::CrawlState;
