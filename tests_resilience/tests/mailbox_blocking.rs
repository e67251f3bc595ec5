//! Blocking Send/Receive Tests
//!
//! Validates that blocked producers and consumers are served in arrival
//! order, that messages are never lost or duplicated while processes park
//! and resume, and that nothing leaks once every process has finished.

use kernel_api::{InterruptSafeMailbox, MailboxApi, MailboxError};
use sim_kernel::test_utils::{wait_for_blocked, wait_for_blocked_count};
use tests_resilience::{finish, spawn_receiver, spawn_sender, test_bootstrap};

/// Test: A sender blocked on a full mailbox moves in when a slot opens
///
/// This validates that:
/// 1. The send beyond capacity parks the sender
/// 2. Occupancy never exceeds capacity
/// 3. The blocked message lands behind the buffered ones
#[test]
fn test_full_mailbox_blocks_sender() {
    let kernel = test_bootstrap();
    let mailboxes = kernel.mailboxes();
    let free = mailboxes.free_slots();

    let id = mailboxes.create(2, 16).unwrap();
    mailboxes.send(id, b"a").unwrap();
    mailboxes.send(id, b"b").unwrap();

    let sender = spawn_sender(&kernel, "sender", id, b"c");
    wait_for_blocked(kernel.scheduler(), sender.pid());

    let stats = mailboxes.stats(id).unwrap();
    assert_eq!(stats.occupied, 2);
    assert_eq!(stats.blocked_producers, 1);

    let mut buffer = [0u8; 16];
    let len = mailboxes.receive(id, &mut buffer).unwrap();
    assert_eq!(&buffer[..len], b"a");
    assert_eq!(finish(sender), Ok(()));

    let stats = mailboxes.stats(id).unwrap();
    assert_eq!(stats.occupied, 2);
    assert_eq!(stats.blocked_producers, 0);

    for expected in [b"b", b"c"] {
        let len = mailboxes.receive(id, &mut buffer).unwrap();
        assert_eq!(&buffer[..len], expected);
    }
    assert_eq!(mailboxes.free_slots(), free);
    assert_eq!(mailboxes.blocked_processes(), 0);
}

/// Test: A blocked receiver is handed the message directly
#[test]
fn test_send_wakes_blocked_receiver() {
    let kernel = test_bootstrap();
    let mailboxes = kernel.mailboxes();
    let free = mailboxes.free_slots();

    let id = mailboxes.create(4, 32).unwrap();
    let receiver = spawn_receiver(&kernel, "receiver", id, 32);
    wait_for_blocked(kernel.scheduler(), receiver.pid());
    assert_eq!(mailboxes.stats(id).unwrap().blocked_consumers, 1);

    mailboxes.send(id, b"direct").unwrap();
    assert_eq!(finish(receiver), Ok(b"direct".to_vec()));

    // Delivered without passing through a slot
    assert_eq!(mailboxes.free_slots(), free);
    assert_eq!(mailboxes.stats(id).unwrap().occupied, 0);
}

/// Test: Zero-capacity mailboxes are a rendezvous
///
/// This validates that:
/// 1. A sender without a receiver parks
/// 2. The receive takes the message straight from the parked sender
/// 3. No slot is ever used
#[test]
fn test_zero_capacity_rendezvous() {
    let kernel = test_bootstrap();
    let mailboxes = kernel.mailboxes();
    let free = mailboxes.free_slots();

    let id = mailboxes.create(0, 16).unwrap();
    let sender = spawn_sender(&kernel, "sender", id, b"meet");
    wait_for_blocked(kernel.scheduler(), sender.pid());
    assert_eq!(mailboxes.free_slots(), free);

    let mut buffer = [0u8; 16];
    let len = mailboxes.receive(id, &mut buffer).unwrap();
    assert_eq!(&buffer[..len], b"meet");
    assert_eq!(finish(sender), Ok(()));

    let receiver = spawn_receiver(&kernel, "receiver", id, 16);
    wait_for_blocked(kernel.scheduler(), receiver.pid());
    mailboxes.send(id, b"again").unwrap();
    assert_eq!(finish(receiver), Ok(b"again".to_vec()));
    assert_eq!(mailboxes.free_slots(), free);
}

/// Test: Blocked receivers are served first come, first served
#[test]
fn test_blocked_receivers_are_fifo() {
    let kernel = test_bootstrap();
    let mailboxes = kernel.mailboxes();
    let id = mailboxes.create(1, 8).unwrap();

    let first = spawn_receiver(&kernel, "first", id, 8);
    wait_for_blocked(kernel.scheduler(), first.pid());
    let second = spawn_receiver(&kernel, "second", id, 8);
    wait_for_blocked(kernel.scheduler(), second.pid());
    let third = spawn_receiver(&kernel, "third", id, 8);
    wait_for_blocked(kernel.scheduler(), third.pid());

    mailboxes.send(id, b"1").unwrap();
    mailboxes.send(id, b"2").unwrap();
    mailboxes.send(id, b"3").unwrap();

    assert_eq!(finish(first), Ok(b"1".to_vec()));
    assert_eq!(finish(second), Ok(b"2".to_vec()));
    assert_eq!(finish(third), Ok(b"3".to_vec()));
}

/// Test: Blocked senders on a synchronous mailbox are served in order
#[test]
fn test_blocked_senders_are_fifo() {
    let kernel = test_bootstrap();
    let mailboxes = kernel.mailboxes();
    let id = mailboxes.create(0, 8).unwrap();

    let first = spawn_sender(&kernel, "first", id, b"one");
    wait_for_blocked(kernel.scheduler(), first.pid());
    let second = spawn_sender(&kernel, "second", id, b"two");
    wait_for_blocked(kernel.scheduler(), second.pid());
    assert_eq!(mailboxes.stats(id).unwrap().blocked_producers, 2);

    let mut buffer = [0u8; 8];
    let len = mailboxes.receive(id, &mut buffer).unwrap();
    assert_eq!(&buffer[..len], b"one");
    let len = mailboxes.receive(id, &mut buffer).unwrap();
    assert_eq!(&buffer[..len], b"two");

    assert_eq!(finish(first), Ok(()));
    assert_eq!(finish(second), Ok(()));
}

/// Test: A receiver whose buffer is too small is woken with an error
///
/// The message goes on to the next receiver that can hold it.
#[test]
fn test_undersized_receiver_is_skipped() {
    let kernel = test_bootstrap();
    let mailboxes = kernel.mailboxes();
    let id = mailboxes.create(1, 32).unwrap();

    let small = spawn_receiver(&kernel, "small", id, 2);
    wait_for_blocked(kernel.scheduler(), small.pid());
    let large = spawn_receiver(&kernel, "large", id, 32);
    wait_for_blocked(kernel.scheduler(), large.pid());

    mailboxes.send(id, b"a longer message").unwrap();

    assert!(matches!(finish(small), Err(MailboxError::InvalidArgument(_))));
    assert_eq!(finish(large), Ok(b"a longer message".to_vec()));
    assert_eq!(mailboxes.stats(id).unwrap().occupied, 0);
}

/// Test: Conditional send reaches a waiting receiver of a synchronous mailbox
#[test]
fn test_cond_send_to_waiting_receiver() {
    let kernel = test_bootstrap();
    let mailboxes = kernel.mailboxes();
    let id = mailboxes.create(0, 8).unwrap();

    assert_eq!(mailboxes.cond_send(id, b"early"), Err(MailboxError::WouldBlock));

    let receiver = spawn_receiver(&kernel, "receiver", id, 8);
    wait_for_blocked(kernel.scheduler(), receiver.pid());
    mailboxes.cond_send(id, b"now").unwrap();
    assert_eq!(finish(receiver), Ok(b"now".to_vec()));
}

/// Test: Conditional send with only undersized receivers waiting
///
/// This validates that:
/// 1. A synchronous mailbox whose waiting receivers cannot hold the message
///    reports `WouldBlock`
/// 2. The undersized receiver stays parked and queued
/// 3. A message that fits is still delivered to it afterwards
#[test]
fn test_cond_send_would_block_when_no_receiver_fits() {
    let kernel = test_bootstrap();
    let mailboxes = kernel.mailboxes();
    let id = mailboxes.create(0, 16).unwrap();

    let small = spawn_receiver(&kernel, "small", id, 2);
    wait_for_blocked(kernel.scheduler(), small.pid());
    let before = mailboxes.stats(id).unwrap();
    assert_eq!(before.blocked_consumers, 1);

    assert_eq!(
        mailboxes.cond_send(id, b"too long"),
        Err(MailboxError::WouldBlock)
    );
    assert_eq!(mailboxes.stats(id).unwrap(), before);
    assert!(kernel.scheduler().is_blocked(small.pid()));

    mailboxes.cond_send(id, b"ok").unwrap();
    assert_eq!(finish(small), Ok(b"ok".to_vec()));
}

/// Test: Conditional operations leave the queues untouched when they fail
#[test]
fn test_would_block_changes_nothing() {
    let kernel = test_bootstrap();
    let mailboxes = kernel.mailboxes();
    let id = mailboxes.create(1, 8).unwrap();
    mailboxes.send(id, b"x").unwrap();

    let sender = spawn_sender(&kernel, "sender", id, b"y");
    wait_for_blocked(kernel.scheduler(), sender.pid());
    let before = mailboxes.stats(id).unwrap();

    assert_eq!(mailboxes.cond_send(id, b"z"), Err(MailboxError::WouldBlock));
    assert_eq!(mailboxes.stats(id).unwrap(), before);

    let mut buffer = [0u8; 8];
    assert_eq!(mailboxes.cond_receive(id, &mut buffer), Ok(1));
    assert_eq!(buffer[0], b'x');
    assert_eq!(finish(sender), Ok(()));
    assert_eq!(mailboxes.cond_receive(id, &mut buffer), Ok(1));
    assert_eq!(buffer[0], b'y');
    assert_eq!(mailboxes.cond_receive(id, &mut buffer), Err(MailboxError::WouldBlock));
}

/// Test: Many producers and consumers through a small mailbox
///
/// Every message is delivered exactly once.
#[test]
fn test_many_producers_and_consumers() {
    let kernel = test_bootstrap();
    let mailboxes = kernel.mailboxes();
    let free = mailboxes.free_slots();
    let id = mailboxes.create(2, 8).unwrap();

    let receivers: Vec<_> = (0..8)
        .map(|n| spawn_receiver(&kernel, &format!("receiver-{}", n), id, 8))
        .collect();
    let senders: Vec<_> = (0..8u8)
        .map(|n| spawn_sender(&kernel, &format!("sender-{}", n), id, &[n]))
        .collect();

    for sender in senders {
        assert_eq!(finish(sender), Ok(()));
    }
    let mut received: Vec<u8> = receivers
        .into_iter()
        .map(|receiver| finish(receiver).unwrap()[0])
        .collect();
    received.sort_unstable();
    assert_eq!(received, (0..8).collect::<Vec<_>>());

    wait_for_blocked_count(kernel.scheduler(), 0);
    assert_eq!(mailboxes.free_slots(), free);
    assert_eq!(mailboxes.blocked_processes(), 0);
}
