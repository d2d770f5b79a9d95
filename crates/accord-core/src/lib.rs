//! Service plumbing shared by Accord binaries: configuration loading,
//! tracing setup, health probes and request-id propagation.

pub mod config;
pub mod health;
pub mod middleware;
pub mod tracing;
