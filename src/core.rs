//! Core system components.
//!
//! Contains the proxy service, the rewriting engine and shared counters.

pub mod proxy;
pub mod rewrite;
pub mod stats;
