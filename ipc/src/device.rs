//! Device mailboxes
//!
//! Every device unit has a zero-capacity mailbox created at boot. Its
//! interrupt handler posts the unit's status there and a driver process
//! picks it up with [`wait_device`].

use core_types::MailboxId;
use hal::{DeviceType, HaltReason, ProcessorHal};
use kernel_api::{MailboxApi, MailboxError};

/// Largest message a device mailbox carries: one status word
pub const DEVICE_MESSAGE_SIZE: usize = 4;

/// Maps a raw device type and unit to the unit's device mailbox
///
/// Halts the machine for an unknown type or an out-of-range unit.
pub fn device_mailbox_id(processor: &dyn ProcessorHal, device_type: u32, unit: u32) -> MailboxId {
    let Some(device) = DeviceType::from_raw(device_type) else {
        log::error!("device type {} does not correspond to any device", device_type);
        processor.halt(HaltReason::UnknownDevice { device_type });
    };
    if unit >= device.units() {
        log::error!("unit number {} is invalid for {}", unit, device);
        processor.halt(HaltReason::InvalidUnit { device_type, unit });
    }
    MailboxId::from_raw(device.mailbox_base() + unit)
}

/// Creates one device mailbox per device unit
///
/// Must run before any other mailbox is created, so that each mailbox
/// lands on the id [`device_mailbox_id`] expects.
pub fn create_device_mailboxes<M>(mailboxes: &M, processor: &dyn ProcessorHal) -> Vec<MailboxId>
where
    M: MailboxApi + ?Sized,
{
    let mut ids = Vec::with_capacity(DeviceType::total_units() as usize);
    for device in DeviceType::ALL {
        for unit in 0..device.units() {
            let expected = device_mailbox_id(processor, device.raw(), unit);
            let id = match mailboxes.create(0, DEVICE_MESSAGE_SIZE) {
                Ok(id) => id,
                Err(err) => {
                    log::error!("{} unit {} mailbox: {}", device, unit, err);
                    processor.halt(HaltReason::IllegalState {
                        operation: "create_device_mailboxes".to_string(),
                        detail: err.to_string(),
                    });
                }
            };
            if id != expected {
                log::error!("{} unit {} got {}, expected {}", device, unit, id, expected);
                processor.halt(HaltReason::IllegalState {
                    operation: "create_device_mailboxes".to_string(),
                    detail: format!("{} unit {} got {} instead of {}", device, unit, id, expected),
                });
            }
            ids.push(id);
        }
    }
    log::info!("created {} device mailboxes", ids.len());
    ids
}

/// Blocks until the next interrupt from a device unit, returning its status
///
/// Clock notifications carry no payload and decode as 0.
pub fn wait_device<M>(
    mailboxes: &M,
    processor: &dyn ProcessorHal,
    device: DeviceType,
    unit: u32,
) -> Result<u32, MailboxError>
where
    M: MailboxApi + ?Sized,
{
    let id = device_mailbox_id(processor, device.raw(), unit);
    let mut word = [0u8; DEVICE_MESSAGE_SIZE];
    let len = mailboxes.receive(id, &mut word)?;
    if len != 0 && len != DEVICE_MESSAGE_SIZE {
        return Err(MailboxError::InvalidArgument(format!(
            "{} unit {} posted a {}-byte status",
            device, unit, len
        )));
    }
    Ok(u32::from_le_bytes(word))
}
