//! Session lifecycle: records, registry, expiry sweeping.

pub mod manager;
pub mod model;

pub use manager::{spawn_sweep_task, SessionManager, SessionStats};
pub use model::{Session, SessionMode};
