// UI and formatting module

pub mod dashboard_tui;
pub mod formatters;
pub mod snapshot;

// Re-export commonly used items for cleaner imports
pub use formatters::{
    fit_width, format_ago, format_bytes, format_cost, format_duration, format_rate, format_tokens,
};
pub use snapshot::{snapshot_sections, SnapshotSection};
