//! Terminal user interface for the OpenClaw dashboard.
//!
//! Provides a live panel grid using ratatui. The UI never fetches anything
//! itself: every frame draws the latest snapshot cache contents.

mod app;
mod event_handler;
mod render;
mod widgets;

pub use app::{run_dashboard, DashboardApp, DashboardAppConfig};
pub use event_handler::DashboardEvent;
pub use widgets::{percent_bar, sparkline, staleness_label, usage_color};
