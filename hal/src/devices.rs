//! Devices that raise interrupts
//!
//! Each device type owns a contiguous range of device mailboxes, one per
//! unit. The raw type codes are the interrupt numbers the vector passes to
//! handlers.

use std::fmt;
use thiserror::Error;

/// A device that notifies drivers through a device mailbox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    Clock,
    Disk,
    Terminal,
}

impl DeviceType {
    /// Every device type, in device mailbox order
    pub const ALL: [DeviceType; 3] = [DeviceType::Clock, DeviceType::Disk, DeviceType::Terminal];

    /// Decodes an interrupt type code
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(DeviceType::Clock),
            2 => Some(DeviceType::Disk),
            3 => Some(DeviceType::Terminal),
            _ => None,
        }
    }

    /// Returns the interrupt type code
    pub const fn raw(&self) -> u32 {
        match self {
            DeviceType::Clock => 0,
            DeviceType::Disk => 2,
            DeviceType::Terminal => 3,
        }
    }

    /// Number of units of this device
    pub const fn units(&self) -> u32 {
        match self {
            DeviceType::Clock => 1,
            DeviceType::Disk => 2,
            DeviceType::Terminal => 4,
        }
    }

    /// First device mailbox id of this device's range
    pub const fn mailbox_base(&self) -> u32 {
        match self {
            DeviceType::Clock => 0,
            DeviceType::Disk => 1,
            DeviceType::Terminal => 3,
        }
    }

    /// Total number of device mailboxes across all devices
    pub fn total_units() -> u32 {
        Self::ALL.iter().map(|device| device.units()).sum()
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::Clock => write!(f, "clock"),
            DeviceType::Disk => write!(f, "disk"),
            DeviceType::Terminal => write!(f, "terminal"),
        }
    }
}

/// Device register errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("{device} unit {unit} does not exist")]
    NoSuchUnit { device: DeviceType, unit: u32 },
}

/// Device status registers
pub trait DeviceHal: Send + Sync {
    /// Reads the status register of one device unit
    fn device_status(&self, device: DeviceType, unit: u32) -> Result<u32, DeviceError>;
}
