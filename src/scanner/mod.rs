//! Source scanning: context-aware brace counting and procedure regions

mod context;
mod region;

pub use context::{scan_line, total_delta, Brace, BraceKind, LineScan, ScanState};
pub use region::{dedent_region, extract_region, indent_block, replace_region, Region};
