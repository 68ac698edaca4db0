//! Interactive TUI module for mqtt-browser

pub mod input;
pub mod render;
pub mod state;
pub mod types;
pub mod viewport;

pub use input::{apply_action, pump_events, run_browser};
pub use state::{BrowserConfig, BrowserState, Snapshot, TopicRow};
pub use types::{action_for_key, should_enable_interactive, Action, Focus};
pub use viewport::PaneViewport;
