// Pairing session state machine tests
// These walk the session through the documented pairing scenarios without any transport

mod common;
use common::setup_logging;

use gateboard::pairing::session::{
    STATUS_CONNECTED, STATUS_INITIALIZING, STATUS_LIMIT_REACHED, STATUS_LOGGED_OUT,
};
use gateboard::pairing::{DisconnectReason, FailureReason, IgnoreReason, PairingSession, Phase, Transition, MAX_QR_ATTEMPTS};

/// Five QR codes exhaust the session, refresh starts a fresh count
#[test]
fn test_attempt_limit_and_refresh() {
    setup_logging();
    let mut session = PairingSession::new();
    assert!(session.start(Some("42")).is_applied());

    assert!(session.on_qr_issued("p1").is_applied());
    assert_eq!(session.attempts(), 1);
    assert_eq!(session.phase(), Phase::AwaitingScan);
    assert_eq!(session.status(), "QR code generated (1/5)");
    assert_eq!(session.qr_payload(), Some("p1"));

    for payload in ["p2", "p3", "p4", "p5"] {
        assert!(session.on_qr_issued(payload).is_applied());
    }
    assert_eq!(session.phase(), Phase::Failed(FailureReason::MaxAttempts));
    assert_eq!(session.attempts(), MAX_QR_ATTEMPTS);
    assert_eq!(session.status(), STATUS_LIMIT_REACHED);

    assert!(session.refresh().is_applied());
    assert_eq!(session.attempts(), 0);
    assert_eq!(session.phase(), Phase::Initializing);
    assert_eq!(session.status(), STATUS_INITIALIZING);
    assert_eq!(session.device_id(), Some("42"));

    // a full new round of issuances is allowed
    for n in 1..MAX_QR_ATTEMPTS {
        session.on_qr_issued(&format!("again-{}", n));
        assert_eq!(session.phase(), Phase::AwaitingScan);
    }
    session.on_qr_issued("again-5");
    assert_eq!(session.phase(), Phase::Failed(FailureReason::MaxAttempts));
}

#[test]
fn test_connected_stops_qr_issuance() {
    setup_logging();
    let mut session = PairingSession::new();
    session.start(Some("42"));
    session.on_qr_issued("p1");
    assert!(session.on_connected().is_applied());
    assert_eq!(session.phase(), Phase::Connected);
    assert_eq!(session.status(), STATUS_CONNECTED);

    let before = session.state().clone();
    assert_eq!(
        session.on_qr_issued("p2"),
        Transition::Ignored(IgnoreReason::InvalidPhase(Phase::Connected))
    );
    assert_eq!(session.state(), &before);
}

#[test]
fn test_logged_out_then_refresh() {
    setup_logging();
    let mut session = PairingSession::new();
    session.start(Some("42"));
    assert!(session.on_disconnected(DisconnectReason::LoggedOut.code()).is_applied());
    assert_eq!(session.phase(), Phase::Failed(FailureReason::LoggedOut));
    assert_eq!(session.status(), STATUS_LOGGED_OUT);

    // no QR codes after logout until the user refreshes
    assert!(!session.on_qr_issued("late").is_applied());

    assert!(session.refresh().is_applied());
    assert_eq!(session.phase(), Phase::Initializing);
    assert!(session.on_qr_issued("p1").is_applied());
    assert_eq!(session.attempts(), 1);
}

#[test]
fn test_disconnect_after_connected() {
    setup_logging();
    let mut session = PairingSession::new();
    session.start(Some("7"));
    session.on_qr_issued("p1");
    session.on_connected();

    // replaced by a newer connection: nothing changes
    assert_eq!(session.on_disconnected(440), Transition::Ignored(IgnoreReason::Superseded));
    assert_eq!(session.phase(), Phase::Connected);

    assert!(session.on_disconnected(DisconnectReason::RestartRequired.code()).is_applied());
    assert_eq!(session.phase(), Phase::Failed(FailureReason::ConnectionLost));
}

#[test]
fn test_operations_before_start_are_ignored() {
    setup_logging();
    let mut session = PairingSession::new();
    assert!(!session.on_connected().is_applied());
    assert!(!session.on_disconnected(401).is_applied());
    assert!(!session.on_transport_error("boom").is_applied());
    assert!(!session.refresh().is_applied());
    assert_eq!(session.phase(), Phase::Idle);
    assert_eq!(session.device_id(), None);
}
