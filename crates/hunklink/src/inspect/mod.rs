//! Human-readable inspection of hunk-format files.

pub mod hexdump;
pub mod report;
pub mod stabs;

pub use hexdump::hexdump;
pub use report::inspect_file;
pub use stabs::{decode_debug, DebugInfo, StabEntry};
