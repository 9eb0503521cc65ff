// src/pairing/controller.rs
//! Async owner of one pairing session.
//!
//! The controller binds a [`PairingSession`] to a transport subscription,
//! turns transport events into session transitions and publishes a
//! [`SessionSnapshot`] after every change. Everything it schedules is
//! released by [`PairingController::close`], which also runs on drop.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;

use crate::notify::{NotificationSink, Toast};
use crate::pairing::render::{render_qr, QrImage, QrRenderFn};
use crate::pairing::session::{IgnoreReason, PairingSession, Phase, Transition};
use crate::pairing::transport::{PairingTransport, TransportError, TransportEvent, TransportSubscription};

type CompletionCallback = Box<dyn FnOnce() + Send + 'static>;
type CompletionSlot = Arc<Mutex<Option<CompletionCallback>>>;

#[derive(Debug, Clone)]
pub struct PairingOptions {
    /// Wait after a successful connection before running the completion callback
    pub settle_delay: Duration,
}

impl Default for PairingOptions {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(2000),
        }
    }
}

/// What the view needs to draw the pairing modal
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub device_id: Option<String>,
    pub device_name: String,
    pub phase: Phase,
    pub attempts: u8,
    pub max_attempts: u8,
    pub status: String,
    pub qr_payload: Option<String>,
    pub qr_image: Option<QrImage>,
    pub loading: bool,
    pub closed: bool,
}

impl SessionSnapshot {
    /// Share of the QR attempts used so far, 0.0..=1.0
    pub fn progress(&self) -> f64 {
        if self.max_attempts == 0 {
            return 0.0;
        }
        (self.attempts as f64 / self.max_attempts as f64).min(1.0)
    }
}

pub struct PairingController {
    transport: Arc<dyn PairingTransport>,
    notifier: Arc<dyn NotificationSink>,
    options: PairingOptions,
    renderer: QrRenderFn,
    session: PairingSession,
    device_name: String,
    subscription: Option<TransportSubscription>,
    qr_image: Option<QrImage>,
    on_complete: CompletionSlot,
    settle: Option<CancellationToken>,
    updates: watch::Sender<SessionSnapshot>,
    closed: bool,
}

impl PairingController {
    pub fn new(
        transport: Arc<dyn PairingTransport>,
        notifier: Arc<dyn NotificationSink>,
        options: PairingOptions,
    ) -> Self {
        let session = PairingSession::new();
        let (updates, _) = watch::channel(SessionSnapshot {
            device_id: None,
            device_name: String::new(),
            phase: session.phase(),
            attempts: session.attempts(),
            max_attempts: session.max_attempts(),
            status: session.status().to_string(),
            qr_payload: None,
            qr_image: None,
            loading: false,
            closed: false,
        });
        PairingController {
            transport,
            notifier,
            options,
            renderer: render_qr,
            session,
            device_name: String::new(),
            subscription: None,
            qr_image: None,
            on_complete: Arc::new(Mutex::new(None)),
            settle: None,
            updates,
            closed: false,
        }
    }

    pub fn with_renderer(mut self, renderer: QrRenderFn) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    /// Snapshot stream, starting with the current value
    pub fn updates(&self) -> WatchStream<SessionSnapshot> {
        WatchStream::new(self.updates.subscribe())
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.updates.borrow().clone()
    }

    pub fn session(&self) -> &PairingSession {
        &self.session
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn has_subscription(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn settle_pending(&self) -> bool {
        self.settle.as_ref().map(|t| !t.is_cancelled()).unwrap_or(false)
    }

    /// Bind to a device and start pairing. `on_complete` runs once, a settle
    /// delay after the device connects, unless the controller is closed first.
    pub async fn open<F>(&mut self, device_id: Option<&str>, device_name: &str, on_complete: F) -> Transition
    where
        F: FnOnce() + Send + 'static,
    {
        if self.closed {
            return Transition::Ignored(IgnoreReason::Closed);
        }
        let transition = self.session.start(device_id);
        if !transition.is_applied() {
            return transition;
        }
        self.device_name = device_name.to_string();
        if let Ok(mut slot) = self.on_complete.lock() {
            *slot = Some(Box::new(on_complete));
        }
        self.publish();
        self.acquire().await;
        transition
    }

    /// Abandon the current attempt and request a new QR code
    pub async fn refresh(&mut self) -> Transition {
        if self.closed {
            return Transition::Ignored(IgnoreReason::Closed);
        }
        let transition = self.session.refresh();
        if !transition.is_applied() {
            return transition;
        }
        // the old subscription goes before a new one is requested
        self.release_subscription();
        self.qr_image = None;
        self.publish();
        self.acquire().await;
        transition
    }

    async fn acquire(&mut self) {
        let Some(device_id) = self.session.device_id().map(str::to_string) else {
            return;
        };
        match self.transport.open(&device_id).await {
            Ok(subscription) => {
                debug!("Acquired transport subscription for device {}", device_id);
                self.subscription = Some(subscription);
            }
            Err(e) => {
                warn!("Failed to open pairing transport for device {}: {}", device_id, e);
                self.session.on_transport_error(&e.to_string());
                self.notifier
                    .notify(Toast::error("Error generating QR code", "Failed to generate QR code. Please try again."));
                self.publish();
            }
        }
    }

    /// Drain every event already queued on the subscription
    pub fn poll_events(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let next = match self.subscription.as_mut() {
                Some(subscription) => subscription.try_next(),
                None => break,
            };
            match next {
                Ok(Some(event)) => {
                    self.handle_event(event);
                    handled += 1;
                }
                Ok(None) => break,
                Err(e) => {
                    self.stream_ended(e);
                    break;
                }
            }
        }
        handled
    }

    /// Wait for the next event and apply it
    pub async fn next_event(&mut self) -> Option<TransportEvent> {
        let event = match self.subscription.as_mut() {
            Some(subscription) => subscription.next().await,
            None => return None,
        };
        match event {
            Some(event) => {
                self.handle_event(event.clone());
                Some(event)
            }
            None => {
                self.stream_ended(TransportError::Closed);
                None
            }
        }
    }

    fn stream_ended(&mut self, error: TransportError) {
        self.subscription = None;
        if self.session.phase().is_live() {
            self.handle_event(TransportEvent::Error(error.to_string()));
        }
    }

    pub fn handle_event(&mut self, event: TransportEvent) -> Transition {
        if self.closed {
            debug!("Dropping {:?} for closed pairing session", event);
            return Transition::Ignored(IgnoreReason::Closed);
        }
        let transition = match event {
            TransportEvent::QrIssued(payload) => {
                let transition = self.session.on_qr_issued(&payload);
                if transition.is_applied() {
                    self.qr_image = None;
                    if self.session.phase() == Phase::AwaitingScan {
                        match (self.renderer)(&payload) {
                            Ok(image) => self.qr_image = Some(image),
                            Err(e) => {
                                warn!("Could not render QR code: {}", e);
                                self.notifier.notify(Toast::error("Error generating QR code", &e.to_string()));
                            }
                        }
                    }
                }
                transition
            }
            TransportEvent::ConnectionOpened => {
                let transition = self.session.on_connected();
                if transition.is_applied() {
                    info!("Device {} connected", self.device_name);
                    self.notifier.notify(Toast::info(
                        "Device connected",
                        &format!("{} has been connected successfully!", self.device_name),
                    ));
                    self.schedule_settle();
                }
                transition
            }
            TransportEvent::ConnectionClosed(code) => {
                let transition = self.session.on_disconnected(code);
                if transition.is_applied() {
                    self.cancel_settle();
                }
                transition
            }
            TransportEvent::Error(detail) => {
                let transition = self.session.on_transport_error(&detail);
                if transition.is_applied() {
                    self.cancel_settle();
                    self.notifier.notify(Toast::error("Connection error", &detail));
                }
                transition
            }
        };
        if transition.is_applied() {
            if matches!(self.session.phase(), Phase::Failed(_)) {
                self.qr_image = None;
                self.release_subscription();
            }
            self.publish();
        }
        transition
    }

    fn schedule_settle(&mut self) {
        self.cancel_settle();
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let slot = self.on_complete.clone();
        let delay = self.options.settle_delay;
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => {
                    debug!("Settle timer cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    let callback = slot.lock().ok().and_then(|mut s| s.take());
                    if let Some(callback) = callback {
                        callback();
                    }
                }
            }
        });
        self.settle = Some(token);
    }

    fn cancel_settle(&mut self) {
        if let Some(token) = self.settle.take() {
            token.cancel();
        }
    }

    fn release_subscription(&mut self) {
        if let Some(mut subscription) = self.subscription.take() {
            subscription.close();
        }
    }

    /// Tear down synchronously. After this nothing scheduled by the
    /// controller can reach the caller.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.cancel_settle();
        if let Ok(mut slot) = self.on_complete.lock() {
            slot.take();
        }
        self.release_subscription();
        debug!("Pairing controller for {:?} closed", self.session.device_id());
        self.publish();
    }

    fn publish(&self) {
        let state = self.session.state();
        self.updates.send_replace(SessionSnapshot {
            device_id: state.device_id.clone(),
            device_name: self.device_name.clone(),
            phase: state.phase,
            attempts: state.attempts,
            max_attempts: self.session.max_attempts(),
            status: state.status.clone(),
            qr_payload: state.qr_payload.clone(),
            qr_image: self.qr_image.clone(),
            loading: state.phase == Phase::Initializing,
            closed: self.closed,
        });
    }
}

impl Drop for PairingController {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::ToastQueue;
    use crate::pairing::render::RenderError;
    use crate::pairing::transport::ChannelTransport;

    fn failing_renderer(_: &str) -> Result<QrImage, RenderError> {
        Err(RenderError::Encode("boom".to_string()))
    }

    #[tokio::test]
    async fn test_render_failure_keeps_awaiting_scan() {
        let transport = ChannelTransport::new();
        let toasts = ToastQueue::default();
        let mut controller =
            PairingController::new(Arc::new(transport.clone()), Arc::new(toasts.clone()), PairingOptions::default())
                .with_renderer(failing_renderer);

        controller.open(Some("1"), "Main", || {}).await;
        transport.latest().unwrap().try_emit(TransportEvent::QrIssued("p1".to_string()));
        assert_eq!(controller.poll_events(), 1);

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.phase, Phase::AwaitingScan);
        assert_eq!(snapshot.qr_payload.as_deref(), Some("p1"));
        assert!(snapshot.qr_image.is_none());
        assert_eq!(toasts.visible()[0].title, "Error generating QR code");
    }

    #[tokio::test]
    async fn test_loading_flag_and_progress() {
        let transport = ChannelTransport::new();
        let mut controller =
            PairingController::new(Arc::new(transport.clone()), Arc::new(ToastQueue::default()), PairingOptions::default());
        controller.open(Some("3"), "Backup", || {}).await;
        assert!(controller.snapshot().loading);

        transport.latest().unwrap().try_emit(TransportEvent::QrIssued("p1".to_string()));
        controller.poll_events();
        let snapshot = controller.snapshot();
        assert!(!snapshot.loading);
        assert!(snapshot.qr_image.is_some());
        assert!((snapshot.progress() - 0.2).abs() < f64::EPSILON);
    }

    /// Hands out subscriptions whose producer is already gone
    struct VanishingTransport;

    #[async_trait::async_trait]
    impl PairingTransport for VanishingTransport {
        async fn open(&self, device_id: &str) -> Result<TransportSubscription, TransportError> {
            let (_tx, rx) = tokio::sync::mpsc::channel(1);
            Ok(TransportSubscription::new(device_id, rx, CancellationToken::new()))
        }
    }

    #[tokio::test]
    async fn test_dropped_producer_maps_to_connection_error() {
        let toasts = ToastQueue::default();
        let mut controller =
            PairingController::new(Arc::new(VanishingTransport), Arc::new(toasts.clone()), PairingOptions::default());
        controller.open(Some("2"), "Support", || {}).await;
        assert!(controller.has_subscription());

        assert_eq!(controller.poll_events(), 0);
        assert_eq!(
            controller.session().phase(),
            Phase::Failed(crate::pairing::session::FailureReason::TransportError)
        );
        assert!(!controller.has_subscription());
        assert_eq!(toasts.visible()[0].title, "Connection error");
    }
}
