//! Runtime plumbing shared by every library-sync crate.
//!
//! [`config`] validates what the host passes in and supplies the default
//! transport, [`logging`] installs the tracing subscriber and the host sink
//! bridge, and [`events`] carries session progress and notifications out to
//! the UI. Review state lives in `core-sync`, not here.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventSeverity, Notification, SyncEvent};
