//! Orchestration engine internals.

pub mod blob;
pub mod cache;
pub mod fallback;
pub mod intent;
pub mod metrics;
pub mod orchestrator;
pub mod providers;
pub mod rate_limit;
pub mod registry;
