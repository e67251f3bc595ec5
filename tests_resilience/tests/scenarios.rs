//! End-to-End Scenarios
//!
//! Whole-system walkthroughs: boot from configuration, run processes that
//! talk through mailboxes, tear everything down again.

use hal::ProcessorHal;
use kernel_api::{InterruptSafeMailbox, KernelConfig, MailboxApi, MailboxError};
use sim_kernel::test_utils::{wait_for_blocked, with_kernel};
use sim_kernel::SimulatedKernel;
use std::io::Write;
use std::sync::Arc;
use tests_resilience::{finish, spawn_receiver, spawn_sender, test_bootstrap, test_bootstrap_with};

/// Test: The basic hello round trip
///
/// This validates that:
/// 1. A one-slot mailbox buffers a message
/// 2. A receive into a larger buffer returns the exact length
/// 3. After release the id no longer resolves
#[test]
fn test_hello_round_trip() {
    let kernel = test_bootstrap();
    let mailboxes = kernel.mailboxes();

    let id = mailboxes.create(1, 16).unwrap();
    mailboxes.send(id, b"hello").unwrap();
    assert_eq!(mailboxes.stats(id).unwrap().occupied, 1);

    let mut buffer = [0u8; 8];
    let len = mailboxes.receive(id, &mut buffer).unwrap();
    assert_eq!(len, 5);
    assert_eq!(&buffer[..len], b"hello");
    assert_eq!(mailboxes.stats(id).unwrap().occupied, 0);

    mailboxes.release(id).unwrap();
    assert_eq!(mailboxes.send(id, b"hello"), Err(MailboxError::NotFound(id)));
}

/// Test: A producer streams through a small mailbox to a consumer
///
/// Order is preserved end to end even though both sides block repeatedly.
#[test]
fn test_pipeline_preserves_order() {
    let kernel = test_bootstrap();
    let id = kernel.mailboxes().create(3, 8).unwrap();
    const COUNT: u32 = 50;

    let producer = {
        let mailboxes = kernel.mailboxes().clone();
        kernel
            .spawn("producer", move || {
                for n in 0..COUNT {
                    mailboxes.send(id, &n.to_le_bytes())?;
                }
                Ok::<(), MailboxError>(())
            })
            .unwrap()
    };
    let consumer = {
        let mailboxes = kernel.mailboxes().clone();
        kernel
            .spawn("consumer", move || {
                let mut seen = Vec::new();
                let mut buffer = [0u8; 4];
                for _ in 0..COUNT {
                    mailboxes.receive(id, &mut buffer)?;
                    seen.push(u32::from_le_bytes(buffer));
                }
                Ok::<Vec<u32>, MailboxError>(seen)
            })
            .unwrap()
    };

    assert_eq!(finish(producer), Ok(()));
    assert_eq!(finish(consumer), Ok((0..COUNT).collect::<Vec<_>>()));
    assert_eq!(kernel.mailboxes().stats(id).unwrap().occupied, 0);
}

/// Test: Request/reply between a client and a server process
#[test]
fn test_request_reply() {
    let kernel = test_bootstrap();
    let requests = kernel.mailboxes().create(0, 16).unwrap();
    let replies = kernel.mailboxes().create(1, 16).unwrap();

    let server = {
        let mailboxes = kernel.mailboxes().clone();
        kernel
            .spawn("server", move || {
                let mut buffer = [0u8; 16];
                for _ in 0..3 {
                    let len = mailboxes.receive(requests, &mut buffer)?;
                    buffer[..len].make_ascii_uppercase();
                    mailboxes.send(replies, &buffer[..len])?;
                }
                Ok::<(), MailboxError>(())
            })
            .unwrap()
    };

    let mailboxes = kernel.mailboxes();
    let mut buffer = [0u8; 16];
    for word in ["ping", "pong", "done"] {
        mailboxes.send(requests, word.as_bytes()).unwrap();
        let len = mailboxes.receive(replies, &mut buffer).unwrap();
        assert_eq!(&buffer[..len], word.to_uppercase().as_bytes());
    }
    assert_eq!(finish(server), Ok(()));
}

/// Test: Boot from a configuration file with small tables
#[test]
fn test_boot_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{ "max_mailboxes": 9, "max_slots": 3, "max_message": 8 }}"#
    )
    .unwrap();
    let config = KernelConfig::load(file.path()).unwrap();
    let kernel = test_bootstrap_with(config);
    let mailboxes = kernel.mailboxes();

    let a = mailboxes.create(2, 8).unwrap();
    let b = mailboxes.create(2, 8).unwrap();
    assert!(matches!(
        mailboxes.create(1, 8),
        Err(MailboxError::ResourceExhausted(_))
    ));
    assert!(matches!(
        mailboxes.create(1, 9),
        Err(MailboxError::InvalidArgument(_))
    ));

    mailboxes.send(a, b"1").unwrap();
    mailboxes.send(a, b"2").unwrap();
    mailboxes.send(b, b"3").unwrap();
    assert!(matches!(
        mailboxes.cond_send(b, b"4"),
        Err(MailboxError::ResourceExhausted(_))
    ));
    assert_eq!(mailboxes.free_slots(), 0);
}

#[test]
fn test_interrupts_enabled_after_operations() {
    with_kernel(KernelConfig::default(), |kernel| {
        let mailboxes = kernel.mailboxes();
        let id = mailboxes.create(1, 8).unwrap();
        mailboxes.send(id, b"x").unwrap();
        let _ = mailboxes.cond_send(id, b"y");
        let mut buffer = [0u8; 8];
        mailboxes.receive(id, &mut buffer).unwrap();
        mailboxes.release(id).unwrap();
        kernel.tick_clock(5);

        let psr = kernel.processor().psr();
        assert!(psr.interrupts_enabled());
        assert!(psr.is_kernel_mode());
    });
}

/// Test: Pids are reused without two live processes sharing a block entry
///
/// This validates that:
/// 1. More short-lived processes than block table entries can run
/// 2. Processes spawned afterwards block alongside an older parked one
/// 3. Nothing halts and every entry is released at the end
#[test]
fn test_many_processes_share_a_small_block_table() {
    let config = KernelConfig {
        max_processes: 4,
        ..KernelConfig::default()
    };
    let kernel = Arc::new(test_bootstrap_with(config));
    let id = kernel.mailboxes().create(0, 8).unwrap();

    let first = spawn_receiver(&kernel, "first", id, 8);
    wait_for_blocked(kernel.scheduler(), first.pid());

    for n in 0..10 {
        let buffered = kernel.mailboxes().create(1, 8).unwrap();
        finish(spawn_sender(&kernel, &format!("short-{}", n), buffered, b"x")).unwrap();
        kernel.mailboxes().release(buffered).unwrap();
    }

    let second = spawn_receiver(&kernel, "second", id, 8);
    wait_for_blocked(kernel.scheduler(), second.pid());
    assert_ne!(first.pid().table_index(4), second.pid().table_index(4));

    finish(spawn_sender(&kernel, "tx-1", id, b"one")).unwrap();
    finish(spawn_sender(&kernel, "tx-2", id, b"two")).unwrap();
    assert_eq!(finish(first), Ok(b"one".to_vec()));
    assert_eq!(finish(second), Ok(b"two".to_vec()));

    assert!(kernel.processor().halts().is_empty());
    assert_eq!(kernel.mailboxes().blocked_processes(), 0);
}

/// Test: Spawning is refused once every block table entry is live
#[test]
fn test_spawn_refused_when_block_table_is_full() {
    let config = KernelConfig {
        max_processes: 1,
        ..KernelConfig::default()
    };
    let kernel = Arc::new(test_bootstrap_with(config));
    let id = kernel.mailboxes().create(0, 8).unwrap();

    let first = spawn_receiver(&kernel, "first", id, 8);
    wait_for_blocked(kernel.scheduler(), first.pid());

    let refused = kernel.spawn("second", || ()).unwrap_err();
    assert_eq!(refused.kind(), std::io::ErrorKind::WouldBlock);
    assert!(kernel.processor().halts().is_empty());

    // The parked receiver owns the only entry, so it is woken from here.
    kernel.mailboxes().cond_send(id, b"go").unwrap();
    assert_eq!(finish(first), Ok(b"go".to_vec()));
}

#[test]
fn test_kernels_are_isolated() {
    let a = SimulatedKernel::boot_default().unwrap();
    let b = SimulatedKernel::boot_default().unwrap();

    let id = a.mailboxes().create(1, 8).unwrap();
    assert_eq!(b.mailboxes().create(1, 8).unwrap(), id);
    a.mailboxes().send(id, b"a").unwrap();

    assert_eq!(b.mailboxes().stats(id).unwrap().occupied, 0);
    assert_eq!(a.mailboxes().stats(id).unwrap().occupied, 1);
}
