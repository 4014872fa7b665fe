//! Marker traits separating writes from reads.
//!
//! Commands change catalog state and are logged at info level by their
//! handlers; queries only read.

/// A request that writes to the catalog.
pub trait Command {}

/// A request that only reads from the catalog.
pub trait Query {}
