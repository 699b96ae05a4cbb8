//! # Integration Flows
//!
//! Behaviour that only shows up when the aggregator is driven from several
//! threads, from inside its own handlers, through a queue, or together with
//! the telemetry crate.

mod concurrency;
mod reentrancy;
