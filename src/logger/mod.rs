//! Process-wide `tracing` setup. Everything else logs through the re-exported
//! macros below.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
