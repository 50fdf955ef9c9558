//! PROMEDIO — Periodic Dollar-Cost-Averaging Agent for Crypto Spot Markets
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod convert;
pub mod engine;
pub mod exchange;
pub mod ledger;
pub mod money;
pub mod reference;
pub mod storage;
pub mod types;
