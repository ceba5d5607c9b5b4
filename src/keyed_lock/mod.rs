//! Per-key exclusive locks local to this process.
//!
//! Holding a guard only excludes other tasks of the same process. Instances
//! sharing one Redis need a store-side primitive instead.

mod keyed_mutex;
pub use keyed_mutex::*;
