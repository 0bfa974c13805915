//! Integration test crate. Everything of interest lives under `tests/`;
//! the shared fixture graph is `tests/fixtures.rs`.
