//! Domain Layer - Cacheable chart responses.
//!
//! Pure types with no I/O: canonical payload bytes, the content-derived
//! validator, and the freshness policy attached to every response.

/// Cache validators and cacheable chart responses.
pub mod cache;
