//! Session primitives for Accord services.
//!
//! Provides signed session claims, the session and two-factor cookie
//! builders, and OAuth bearer-token extraction from request parts.

pub mod bearer;
pub mod claims;
pub mod cookie;
