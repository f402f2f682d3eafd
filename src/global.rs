//! Process-wide container for the application's composition root.
//!
//! Library code should take a `&mut Container` explicitly. This accessor exists
//! only so a binary can wire its object graph once at startup and reach it from
//! `main`-level glue.

use once_cell::sync::OnceCell;
use parking_lot::{Mutex, MutexGuard};

use crate::container::Container;
use crate::errors::{ContainerError, Result};

static GLOBAL_CONTAINER: OnceCell<Mutex<Container>> = OnceCell::new();

/// Install the process-wide container. Succeeds at most once per process, and
/// fails if [`global`] already created a default container.
pub fn install(container: Container) -> Result<()> {
    GLOBAL_CONTAINER
        .set(Mutex::new(container))
        .map_err(|_| ContainerError::AlreadyInitialized)
}

/// Lock the process-wide container, creating an empty one on first access if
/// nothing was installed.
pub fn global() -> MutexGuard<'static, Container> {
    GLOBAL_CONTAINER
        .get_or_init(|| Mutex::new(Container::new()))
        .lock()
}

pub fn is_initialized() -> bool {
    GLOBAL_CONTAINER.get().is_some()
}
