//! Line-oriented file storage
//!
//! - `engine`: the storage engine trait
//! - `disk`: files under a data directory
//! - `memory`: in-memory files, used by unit tests

pub mod disk;
pub mod engine;
pub mod memory;
