// Common test utilities for integration tests
// This module contains shared code for all integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

use log::LevelFilter;

use gateboard::notify::ToastQueue;
use gateboard::pairing::{ChannelTransport, PairingController, PairingOptions, ScriptHandle, TransportEvent};

// Initialize logging once
static INIT_LOGGER: Once = Once::new();

/// Set up the logger for the tests
pub fn setup_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

/// Controller wired to a scripted transport and an inspectable toast queue
pub struct Harness {
    pub transport: ChannelTransport,
    pub toasts: ToastQueue,
    pub controller: PairingController,
}

pub fn harness() -> Harness {
    harness_with(PairingOptions::default())
}

pub fn harness_with(options: PairingOptions) -> Harness {
    setup_logging();
    let transport = ChannelTransport::new();
    let toasts = ToastQueue::default();
    let controller = PairingController::new(Arc::new(transport.clone()), Arc::new(toasts.clone()), options);
    Harness {
        transport,
        toasts,
        controller,
    }
}

impl Harness {
    /// Sender for the most recently opened subscription
    pub fn script(&self) -> ScriptHandle {
        self.transport.latest().expect("no subscription has been opened")
    }

    /// Push an event through the transport and let the controller drain it
    pub fn push(&mut self, event: TransportEvent) -> usize {
        assert!(self.script().try_emit(event), "transport subscription already released");
        self.controller.poll_events()
    }

    pub fn push_qr(&mut self, payload: &str) -> usize {
        self.push(TransportEvent::QrIssued(payload.to_string()))
    }

    pub fn toast_titles(&self) -> Vec<String> {
        self.toasts.visible().into_iter().map(|t| t.title).collect()
    }
}

/// Completion callback that counts how often it ran
pub fn completion_counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
    let count = Arc::new(AtomicUsize::new(0));
    let handle = count.clone();
    (count, move || {
        handle.fetch_add(1, Ordering::SeqCst);
    })
}

pub fn fired(count: &Arc<AtomicUsize>) -> usize {
    count.load(Ordering::SeqCst)
}
