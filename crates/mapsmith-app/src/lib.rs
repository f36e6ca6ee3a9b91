//! Mapsmith Application
//!
//! Headless shell around the editing core: loads a map, rebuilds its
//! runtime state and runs one-shot commands against it.

mod app;
mod args;
mod shortcuts;

pub use app::{App, AppError, LogNotifier, run};
pub use args::{Args, Command};
pub use shortcuts::{Shortcut, ShortcutRegistry};
