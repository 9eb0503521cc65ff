// src/pairing/mod.rs
pub mod controller;
pub mod render;
pub mod session;
pub mod transport;

pub use controller::{PairingController, PairingOptions, SessionSnapshot};
pub use render::{render_qr, QrImage, RenderError};
pub use session::{
    classify_disconnect, DisconnectClass, DisconnectReason, FailureReason, IgnoreReason, PairingSession, Phase,
    SessionState, Transition, MAX_QR_ATTEMPTS,
};
pub use transport::{
    ChannelTransport, MockTransport, MockTransportOptions, PairingTransport, ScriptHandle, TransportError,
    TransportEvent, TransportSubscription,
};
