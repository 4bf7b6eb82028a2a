//! PROPEDGE: player-prop matching and parlay synthesis engine
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod matching;
pub mod odds;
pub mod parlay;
pub mod providers;
pub mod storage;
pub mod sync;
pub mod engine;
