//! Cascading selection pipeline: group catalog, member list, detail pane.

pub mod browser;
pub mod generation;
pub mod task;

pub use browser::{Browser, DetailPane, DetailState, Status, StatusLevel};
pub use task::ThreadSpawner;
