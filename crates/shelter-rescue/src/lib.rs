//! Rescue assignment and qualification matching engine.
//!
//! Turns incoming urgent-animal reports into dispatched, tracked, and completed volunteer
//! assignments while keeping unqualified or duplicate responders out.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
