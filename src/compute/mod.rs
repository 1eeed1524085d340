//! Compute layer: hierarchical point clustering and input validation.
//!
//! Nothing here knows about markers or the store catalog; the cluster index
//! is generic over the payload it carries.

pub mod cluster;
pub mod validation;
