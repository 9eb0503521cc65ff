// Dashboard data tests
// Fixture queries and form flows the pages are built on

mod common;
use common::{harness, setup_logging};

use gateboard::fixtures::{filter_devices, message_history, search_contacts, FixtureStore};
use gateboard::forms::{add_device, FormError, MessageDraft};
use gateboard::pairing::{Phase, TransportEvent};
use gateboard::routes::Route;
use gateboard::DeviceStatus;

#[test]
fn test_dashboard_stats_match_fixtures() {
    setup_logging();
    let store = FixtureStore;
    let stats = store.stats();
    assert_eq!(stats.total_devices as usize, store.devices().len());
    assert_eq!(stats.active_devices as usize, store.connected_devices().len());
    assert_eq!(stats.messages_today(), stats.messages_sent + stats.messages_received);
    assert_eq!(
        stats.active_campaigns as usize,
        store.campaigns().iter().filter(|c| c.status.is_active()).count()
    );
}

#[test]
fn test_every_fixture_campaign_validates() {
    for campaign in FixtureStore.campaigns() {
        campaign.validate().unwrap();
        assert!(campaign.progress_percent() <= 100);
    }
}

#[test]
fn test_history_resolves_contacts_by_phone() {
    let history = message_history(FixtureStore.messages(), FixtureStore.contacts(), "");
    assert_eq!(history.len(), FixtureStore.messages().len());
    assert!(history.iter().all(|e| e.contact.is_some()));
}

#[test]
fn test_contact_search_is_case_insensitive() {
    let contacts = FixtureStore.contacts();
    let ids = |term: &str| -> Vec<String> { search_contacts(contacts, term).iter().map(|c| c.id.clone()).collect() };
    assert!(!ids("john").is_empty());
    assert_eq!(ids("john"), ids("JOHN"));
}

/// Add Device appends a pending device, which can then be paired
#[tokio::test]
async fn test_added_device_goes_through_pairing() {
    let mut devices = FixtureStore.devices().to_vec();
    assert_eq!(add_device(&mut devices, ""), Err(FormError::EmptyDeviceName));

    let device = add_device(&mut devices, "Warehouse").unwrap();
    let pending = filter_devices(&devices, "", Some(DeviceStatus::Pending));
    assert!(pending.iter().any(|d| d.id == device.id));

    let mut h = harness();
    h.controller.open(Some(&device.id), &device.name, || {}).await;
    assert_eq!(h.script().device_id, device.id);
    h.push_qr("p1");
    h.push(TransportEvent::ConnectionOpened);
    assert_eq!(h.controller.snapshot().phase, Phase::Connected);
    h.controller.close();
}

#[test]
fn test_bulk_draft_against_fixture_devices() {
    let mut draft = MessageDraft {
        content: "Big sale this weekend".to_string(),
        device_id: Some("1".to_string()),
        ..MessageDraft::default()
    };
    for contact in FixtureStore.contacts() {
        draft.toggle_recipient(&contact.id);
    }
    let dispatch = draft.validate(FixtureStore.devices()).unwrap();
    assert_eq!(dispatch.recipients.len(), 5);
    assert_eq!(dispatch.summary(), "Message sent to 5 recipient(s)");
}

#[test]
fn test_unknown_route_is_not_found() {
    assert_eq!(Route::from_path("/devices"), Route::Devices);
    assert_eq!(Route::from_path("/nope"), Route::NotFound);
}
