// Pairing transports
// A transport hands out one event subscription per pairing attempt.
// Dropping or closing the subscription stops whatever feeds it.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use rand::{distributions::Alphanumeric, Rng};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::sync::CancellationToken;

const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    QrIssued(String),
    ConnectionOpened,
    ConnectionClosed(u16),
    Error(String),
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    #[error("Device {0} was rejected by the transport")]
    Rejected(String),

    #[error("Event stream closed")]
    Closed,
}

/// Event stream for one pairing attempt
pub struct TransportSubscription {
    device_id: String,
    events: mpsc::Receiver<TransportEvent>,
    cancel: CancellationToken,
}

impl TransportSubscription {
    pub fn new(device_id: &str, events: mpsc::Receiver<TransportEvent>, cancel: CancellationToken) -> Self {
        TransportSubscription {
            device_id: device_id.to_string(),
            events,
            cancel,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Non-blocking read. `Ok(None)` means nothing is pending right now.
    pub fn try_next(&mut self) -> Result<Option<TransportEvent>, TransportError> {
        match self.events.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Closed),
        }
    }

    pub async fn next(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    pub fn close(&mut self) {
        if !self.cancel.is_cancelled() {
            debug!("Releasing transport subscription for device {}", self.device_id);
        }
        self.cancel.cancel();
        self.events.close();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for TransportSubscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait]
pub trait PairingTransport: Send + Sync {
    async fn open(&self, device_id: &str) -> Result<TransportSubscription, TransportError>;
}

// ------------------- Mock transport -------------------

#[derive(Debug, Clone)]
pub struct MockTransportOptions {
    /// Delay before the first QR code
    pub initial_delay: Duration,
    /// Time between QR codes after the first
    pub qr_interval: Duration,
    /// Simulate a successful scan of this QR attempt
    pub connect_on_attempt: Option<u8>,
    /// Delay between issuing that QR code and the connection opening
    pub connect_delay: Duration,
}

impl Default for MockTransportOptions {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(1500),
            qr_interval: Duration::from_secs(45),
            connect_on_attempt: None,
            connect_delay: Duration::from_secs(10),
        }
    }
}

/// Timer-driven stand-in for a real pairing provider
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    options: MockTransportOptions,
}

impl MockTransport {
    pub fn new(options: MockTransportOptions) -> Self {
        MockTransport { options }
    }

    pub fn options(&self) -> &MockTransportOptions {
        &self.options
    }
}

/// Opaque pairing reference in the `ref,device,attempt` shape real providers use
pub fn mock_payload(device_id: &str, attempt: u8) -> String {
    let reference: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();
    format!("2@{},{},{}", reference, device_id, attempt)
}

/// Sleep unless cancelled first. Returns false on cancellation.
async fn sleep_or_cancel(token: &CancellationToken, delay: Duration) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}

#[async_trait]
impl PairingTransport for MockTransport {
    async fn open(&self, device_id: &str) -> Result<TransportSubscription, TransportError> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let options = self.options.clone();
        let device = device_id.to_string();

        info!("Mock transport opened for device {}", device);

        tokio::spawn(async move {
            let mut attempt: u8 = 0;
            let mut delay = options.initial_delay;
            loop {
                if !sleep_or_cancel(&token, delay).await {
                    break;
                }
                attempt = attempt.saturating_add(1);
                if tx.send(TransportEvent::QrIssued(mock_payload(&device, attempt))).await.is_err() {
                    break;
                }
                if options.connect_on_attempt == Some(attempt) {
                    if sleep_or_cancel(&token, options.connect_delay).await {
                        let _ = tx.send(TransportEvent::ConnectionOpened).await;
                        // the link stays up until the subscriber lets go
                        token.cancelled().await;
                    }
                    break;
                }
                delay = options.qr_interval;
            }
            debug!("Mock transport for device {} stopped after {} QR code(s)", device, attempt);
        });

        Ok(TransportSubscription::new(device_id, rx, cancel))
    }
}

// ------------------- Channel transport -------------------

/// Sending half of one subscription opened on a [`ChannelTransport`]
#[derive(Clone)]
pub struct ScriptHandle {
    pub device_id: String,
    tx: mpsc::Sender<TransportEvent>,
    cancel: CancellationToken,
}

impl ScriptHandle {
    pub async fn emit(&self, event: TransportEvent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.tx.send(event).await.is_ok()
    }

    pub fn try_emit(&self, event: TransportEvent) -> bool {
        !self.cancel.is_cancelled() && self.tx.try_send(event).is_ok()
    }

    /// True once the subscriber has closed or dropped its subscription
    pub fn is_released(&self) -> bool {
        self.cancel.is_cancelled() || self.tx.is_closed()
    }
}

#[derive(Default)]
struct ChannelState {
    handles: Vec<ScriptHandle>,
    fail_next: Option<String>,
}

/// Transport whose events are pushed by the caller
#[derive(Clone, Default)]
pub struct ChannelTransport {
    state: Arc<Mutex<ChannelState>>,
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `open` fail with [`TransportError::Unavailable`]
    pub fn fail_next_open(&self, reason: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_next = Some(reason.to_string());
        }
    }

    pub fn open_count(&self) -> usize {
        self.state.lock().map(|s| s.handles.len()).unwrap_or(0)
    }

    pub fn handles(&self) -> Vec<ScriptHandle> {
        self.state.lock().map(|s| s.handles.clone()).unwrap_or_default()
    }

    pub fn latest(&self) -> Option<ScriptHandle> {
        self.state.lock().ok().and_then(|s| s.handles.last().cloned())
    }
}

#[async_trait]
impl PairingTransport for ChannelTransport {
    async fn open(&self, device_id: &str) -> Result<TransportSubscription, TransportError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| TransportError::Unavailable("transport state poisoned".to_string()))?;
        if let Some(reason) = state.fail_next.take() {
            warn!("Channel transport refusing device {}: {}", device_id, reason);
            return Err(TransportError::Unavailable(reason));
        }
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        state.handles.push(ScriptHandle {
            device_id: device_id.to_string(),
            tx,
            cancel: cancel.clone(),
        });
        Ok(TransportSubscription::new(device_id, rx, cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_payload_shape() {
        let a = mock_payload("7", 1);
        let b = mock_payload("7", 1);
        assert!(a.starts_with("2@"));
        assert!(a.ends_with(",7,1"));
        assert_ne!(a, b, "payloads carry a random reference");
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_transport_timing() {
        let transport = MockTransport::new(MockTransportOptions {
            initial_delay: Duration::from_millis(1500),
            qr_interval: Duration::from_secs(45),
            connect_on_attempt: Some(2),
            connect_delay: Duration::from_secs(10),
        });
        let mut sub = transport.open("9").await.unwrap();

        let start = tokio::time::Instant::now();
        match sub.next().await {
            Some(TransportEvent::QrIssued(p)) => assert!(p.ends_with(",9,1")),
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(start.elapsed(), Duration::from_millis(1500));

        match sub.next().await {
            Some(TransportEvent::QrIssued(p)) => assert!(p.ends_with(",9,2")),
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(sub.next().await, Some(TransportEvent::ConnectionOpened));
        assert_eq!(start.elapsed(), Duration::from_millis(1500 + 45_000 + 10_000));
        sub.close();
    }

    #[tokio::test(start_paused = true)]
    async fn test_closing_stops_mock_producer() {
        let transport = MockTransport::default();
        let mut sub = transport.open("1").await.unwrap();
        sub.close();
        assert!(sub.is_closed());
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(sub.next().await, None);
    }

    #[tokio::test]
    async fn test_channel_transport_release_and_failure() {
        let transport = ChannelTransport::new();
        transport.fail_next_open("offline");
        assert!(matches!(transport.open("1").await, Err(TransportError::Unavailable(_))));
        assert_eq!(transport.open_count(), 0);

        let mut sub = transport.open("1").await.unwrap();
        let handle = transport.latest().unwrap();
        assert!(handle.emit(TransportEvent::QrIssued("p1".to_string())).await);
        assert_eq!(sub.try_next().unwrap(), Some(TransportEvent::QrIssued("p1".to_string())));
        assert_eq!(sub.try_next().unwrap(), None);

        drop(sub);
        assert!(handle.is_released());
        assert!(!handle.try_emit(TransportEvent::ConnectionOpened));
    }
}
