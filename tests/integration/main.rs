//! Integration tests for the crawler
//!
//! These tests use wiremock to stand in for the movie sites and for a
//! WebDriver endpoint, and drive whole runs through the coordinator.

mod common;
mod crawl_tests;
mod render_tests;
