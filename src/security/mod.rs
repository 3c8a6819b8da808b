//! Security checks performed at server startup

mod privileges;

pub use privileges::{lock_memory, PrivilegeLevel};

use tracing::{info, warn};

/// Log what the process is allowed to do before serving requests
pub fn startup_check() -> PrivilegeLevel {
    let level = PrivilegeLevel::detect();
    if level.is_elevated() {
        info!("Running with {} privileges", level);
        lock_memory();
    } else {
        warn!(
            "Running as {} without elevated privileges; device reconfiguration will likely fail with permission denied",
            level
        );
    }
    level
}
