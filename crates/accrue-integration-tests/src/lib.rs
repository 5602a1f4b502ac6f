//! Integration test crate for the reward engine.
//!
//! This crate has no library code. It only contains integration tests that
//! drive the engine end to end across the types, store, vesting and engine
//! crates, using in-memory SQLite and the stub oracle and bank.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p accrue-integration-tests
//! ```
