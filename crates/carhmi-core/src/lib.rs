pub mod bindings;
pub mod config;
pub mod event;

use std::time::Duration;

/// How long the system stays alive after ignition power is lost.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Volume delta applied per volume event or repeat tick.
pub const VOLUME_STEP: i8 = 2;

/// Event loop tick window; repeatable actions fire once per tick.
pub const TICK: Duration = Duration::from_millis(100);
