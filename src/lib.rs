//! Watch a Docker daemon's lifecycle events and enrich each one with the
//! container it refers to.

pub mod daemon;
pub mod event;
pub mod watcher;

pub use daemon::{DaemonClient, UnixSocketClient};
pub use event::{Container, Event};
pub use watcher::{EventWatcher, WatchError, WatchHandle, WatchOutcome, WatchSummary};
