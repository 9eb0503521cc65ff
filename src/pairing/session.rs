// src/pairing/session.rs
//! QR pairing session state machine
//!
//! The session is a plain value: every operation computes the next
//! [`SessionState`] from the current one and swaps it in whole, so there is
//! never a half-applied update to read from. Operations that are not valid
//! in the current phase are reported as [`Transition::Ignored`] and leave the
//! state untouched.

use log::{debug, info, warn};

/// Number of QR codes issued before the session gives up
pub const MAX_QR_ATTEMPTS: u8 = 5;

pub const STATUS_IDLE: &str = "Waiting to start";
pub const STATUS_INITIALIZING: &str = "Initializing connection...";
pub const STATUS_LIMIT_REACHED: &str = "QR code limit reached. Press refresh to try again.";
pub const STATUS_CONNECTED: &str = "Connected successfully!";
pub const STATUS_LOGGED_OUT: &str = "Device logged out. Press refresh to pair again.";
pub const STATUS_CONNECTION_LOST: &str = "Connection lost. Press refresh to retry.";
pub const STATUS_CONNECTION_ERROR: &str = "Connection error";

/// Why a session ended up in [`Phase::Failed`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    MaxAttempts,
    LoggedOut,
    ConnectionLost,
    TransportError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Initializing,
    AwaitingScan,
    Connected,
    Failed(FailureReason),
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Connected | Phase::Failed(_))
    }

    /// Phases in which the pairing exchange is still running
    pub fn is_live(&self) -> bool {
        matches!(self, Phase::Initializing | Phase::AwaitingScan | Phase::Connected)
    }
}

/// Close codes reported by the pairing transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    LoggedOut = 401,
    Forbidden = 403,
    ConnectionLost = 408,
    MultideviceMismatch = 411,
    ConnectionClosed = 428,
    ConnectionReplaced = 440,
    BadSession = 500,
    Unavailable = 503,
    RestartRequired = 515,
}

impl DisconnectReason {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            401 => Some(DisconnectReason::LoggedOut),
            403 => Some(DisconnectReason::Forbidden),
            408 => Some(DisconnectReason::ConnectionLost),
            411 => Some(DisconnectReason::MultideviceMismatch),
            428 => Some(DisconnectReason::ConnectionClosed),
            440 => Some(DisconnectReason::ConnectionReplaced),
            500 => Some(DisconnectReason::BadSession),
            503 => Some(DisconnectReason::Unavailable),
            515 => Some(DisconnectReason::RestartRequired),
            _ => None,
        }
    }

    pub fn code(self) -> u16 {
        self as u16
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectClass {
    /// Credentials are gone; pairing must start over
    LoggedOut,
    /// The link dropped; the user may retry
    Transient,
    /// A newer connection took over; nothing to do
    Ignored,
}

pub fn classify_disconnect(code: u16) -> DisconnectClass {
    match DisconnectReason::from_code(code) {
        Some(DisconnectReason::LoggedOut) | Some(DisconnectReason::Forbidden) => DisconnectClass::LoggedOut,
        Some(DisconnectReason::ConnectionReplaced) => DisconnectClass::Ignored,
        _ => DisconnectClass::Transient,
    }
}

/// Why an operation did not change the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    MissingDevice,
    InvalidPhase(Phase),
    Superseded,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Ignored(IgnoreReason),
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub device_id: Option<String>,
    pub phase: Phase,
    pub attempts: u8,
    pub qr_payload: Option<String>,
    pub status: String,
}

impl SessionState {
    fn idle() -> Self {
        SessionState {
            device_id: None,
            phase: Phase::Idle,
            attempts: 0,
            qr_payload: None,
            status: STATUS_IDLE.to_string(),
        }
    }

    fn initializing(&self, attempts: u8) -> Self {
        SessionState {
            device_id: self.device_id.clone(),
            phase: Phase::Initializing,
            attempts,
            qr_payload: None,
            status: STATUS_INITIALIZING.to_string(),
        }
    }

    fn failed(&self, reason: FailureReason, status: &str) -> Self {
        SessionState {
            phase: Phase::Failed(reason),
            status: status.to_string(),
            ..self.clone()
        }
    }
}

pub struct PairingSession {
    state: SessionState,
    max_attempts: u8,
}

impl Default for PairingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PairingSession {
    pub fn new() -> Self {
        PairingSession {
            state: SessionState::idle(),
            max_attempts: MAX_QR_ATTEMPTS,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn attempts(&self) -> u8 {
        self.state.attempts
    }

    pub fn max_attempts(&self) -> u8 {
        self.max_attempts
    }

    pub fn status(&self) -> &str {
        &self.state.status
    }

    pub fn device_id(&self) -> Option<&str> {
        self.state.device_id.as_deref()
    }

    pub fn qr_payload(&self) -> Option<&str> {
        self.state.qr_payload.as_deref()
    }

    fn commit(&mut self, next: SessionState) -> Transition {
        debug!(
            "Pairing session {:?}: {:?} -> {:?} (attempt {}/{})",
            next.device_id, self.state.phase, next.phase, next.attempts, self.max_attempts
        );
        self.state = next;
        Transition::Applied
    }

    fn ignore(&self, operation: &str) -> Transition {
        debug!("Ignoring {} in phase {:?}", operation, self.state.phase);
        Transition::Ignored(IgnoreReason::InvalidPhase(self.state.phase))
    }

    /// Bind the session to a device and begin pairing
    pub fn start(&mut self, device_id: Option<&str>) -> Transition {
        let device_id = match device_id.map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                warn!("Pairing start requested without a device id");
                return Transition::Ignored(IgnoreReason::MissingDevice);
            }
        };
        if self.state.phase != Phase::Idle {
            return self.ignore("start");
        }
        info!("Starting pairing session for device {}", device_id);
        let next = SessionState {
            device_id: Some(device_id),
            ..SessionState::idle()
        }
        .initializing(0);
        self.commit(next)
    }

    pub fn on_qr_issued(&mut self, payload: &str) -> Transition {
        if !matches!(self.state.phase, Phase::Initializing | Phase::AwaitingScan) {
            return self.ignore("QR issue");
        }
        let attempts = self.state.attempts.saturating_add(1);
        let next = if attempts >= self.max_attempts {
            info!("QR attempt limit reached for device {:?}", self.state.device_id);
            SessionState {
                device_id: self.state.device_id.clone(),
                phase: Phase::Failed(FailureReason::MaxAttempts),
                attempts: self.max_attempts,
                qr_payload: Some(payload.to_string()),
                status: STATUS_LIMIT_REACHED.to_string(),
            }
        } else {
            SessionState {
                device_id: self.state.device_id.clone(),
                phase: Phase::AwaitingScan,
                attempts,
                qr_payload: Some(payload.to_string()),
                status: format!("QR code generated ({}/{})", attempts, self.max_attempts),
            }
        };
        self.commit(next)
    }

    pub fn on_connected(&mut self) -> Transition {
        if self.state.phase != Phase::AwaitingScan {
            return self.ignore("connection opened");
        }
        let next = SessionState {
            phase: Phase::Connected,
            status: STATUS_CONNECTED.to_string(),
            ..self.state.clone()
        };
        self.commit(next)
    }

    pub fn on_disconnected(&mut self, code: u16) -> Transition {
        if !self.state.phase.is_live() {
            return self.ignore("disconnect");
        }
        let next = match classify_disconnect(code) {
            DisconnectClass::Ignored => {
                debug!("Disconnect code {} superseded by a newer connection", code);
                return Transition::Ignored(IgnoreReason::Superseded);
            }
            DisconnectClass::LoggedOut => self.state.failed(FailureReason::LoggedOut, STATUS_LOGGED_OUT),
            DisconnectClass::Transient => self.state.failed(FailureReason::ConnectionLost, STATUS_CONNECTION_LOST),
        };
        info!("Pairing session closed with code {} for device {:?}", code, self.state.device_id);
        self.commit(next)
    }

    /// Map any transport failure to the generic error status
    pub fn on_transport_error(&mut self, detail: &str) -> Transition {
        if !self.state.phase.is_live() {
            return self.ignore("transport error");
        }
        warn!("Transport error for device {:?}: {}", self.state.device_id, detail);
        let next = self.state.failed(FailureReason::TransportError, STATUS_CONNECTION_ERROR);
        self.commit(next)
    }

    /// Start a new pairing attempt. Only the attempt limit resets the counter.
    pub fn refresh(&mut self) -> Transition {
        let attempts = match self.state.phase {
            Phase::Failed(FailureReason::MaxAttempts) => 0,
            Phase::Initializing | Phase::AwaitingScan | Phase::Failed(_) => self.state.attempts,
            Phase::Idle | Phase::Connected => return self.ignore("refresh"),
        };
        let next = self.state.initializing(attempts);
        self.commit(next)
    }
}
