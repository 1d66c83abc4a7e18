//! The process-wide engine singleton.
//!
//! The engine holds the backend driver and is initialized exactly once per
//! process. Every thread opens its physical connections through it.

use std::sync::OnceLock;
use tinyorm_core::error::{ConfigError, ConnectionError, ConnectionErrorKind};
use tinyorm_core::{Driver, DriverConnection, Error, Result};
use tracing::info;

static ENGINE: OnceLock<Engine> = OnceLock::new();

/// The engine: owner of the backend driver.
pub struct Engine {
    driver: Box<dyn Driver>,
}

impl Engine {
    /// Open a new physical connection through the driver.
    pub(crate) fn connect(&self) -> Result<Box<dyn DriverConnection>> {
        self.driver.connect()
    }

    /// The backend name, for log messages.
    pub fn driver_name(&self) -> &'static str {
        self.driver.name()
    }
}

/// Initialize the process-wide engine with the given driver.
///
/// Fails with a configuration error if the engine was already initialized;
/// the first initialization always wins.
pub fn create_engine(driver: impl Driver + 'static) -> Result<()> {
    let engine = Engine {
        driver: Box::new(driver),
    };
    ENGINE.set(engine).map_err(|_| {
        Error::Config(ConfigError {
            message: "engine is already initialized".to_string(),
        })
    })?;
    // set() can only succeed once, so get() is populated here
    if let Some(engine) = ENGINE.get() {
        info!(driver = engine.driver_name(), "engine initialized");
    }
    Ok(())
}

/// Get the process-wide engine.
pub fn engine() -> Result<&'static Engine> {
    ENGINE.get().ok_or_else(|| {
        Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::NoEngine,
            message: "engine is not initialized, call create_engine first".to_string(),
            source: None,
        })
    })
}
