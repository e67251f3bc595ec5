//! Kernel configuration
//!
//! Table sizes are fixed at boot. Every table is allocated once from these
//! values and never grows afterwards.

use crate::ConfigError;
use core_types::limits;
use hal::DeviceType;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Boot-time configuration of the mailbox layer
///
/// Missing fields in a JSON document take their default values.
///
/// ```
/// use kernel_api::KernelConfig;
///
/// let config = KernelConfig::from_json(r#"{ "max_slots": 64, "debug": true }"#).unwrap();
/// assert_eq!(config.max_slots, 64);
/// assert_eq!(config.max_mailboxes, 2000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Mailbox table size
    pub max_mailboxes: usize,
    /// Slot pool size
    pub max_slots: usize,
    /// Largest message any mailbox may carry
    pub max_message: usize,
    /// Process block table size
    pub max_processes: usize,
    /// Clock interrupts per clock mailbox notification
    pub clock_batch: u32,
    /// Enables debug tracing of mailbox operations and handlers
    pub debug: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_mailboxes: limits::MAX_MAILBOXES,
            max_slots: limits::MAX_SLOTS,
            max_message: limits::MAX_MESSAGE,
            max_processes: limits::MAX_PROCESSES,
            clock_batch: limits::CLOCK_BATCH,
            debug: false,
        }
    }
}

impl KernelConfig {
    /// Parses and validates a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: KernelConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Returns a copy with debug tracing switched on or off
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Checks that the tables can be built from this configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let device_mailboxes = DeviceType::total_units() as usize;
        if self.max_mailboxes < device_mailboxes {
            return Err(ConfigError::Invalid(format!(
                "max_mailboxes must be at least {} to hold the device mailboxes",
                device_mailboxes
            )));
        }
        // Ids are generation * max_mailboxes + index; leave room for at
        // least two generations.
        if self.max_mailboxes as u64 > u32::MAX as u64 / 2 {
            return Err(ConfigError::Invalid(
                "max_mailboxes is too large for 32-bit mailbox ids".to_string(),
            ));
        }
        if self.max_slots == 0 {
            return Err(ConfigError::Invalid("max_slots must be non-zero".to_string()));
        }
        if self.max_message < 4 {
            return Err(ConfigError::Invalid(
                "max_message must fit a device status word".to_string(),
            ));
        }
        if self.max_processes == 0 {
            return Err(ConfigError::Invalid(
                "max_processes must be non-zero".to_string(),
            ));
        }
        if self.clock_batch == 0 {
            return Err(ConfigError::Invalid(
                "clock_batch must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
