// Re-export modules for the binary and the integration tests
pub mod config;
pub mod fixtures;
pub mod forms;
pub mod models;
pub mod notify;
pub mod pairing;
pub mod routes;
pub mod utils;

// Re-export main types for convenience
pub use models::*;
pub use pairing::{PairingController, PairingSession, Phase, Transition};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_status_labels() {
        assert_eq!(DeviceStatus::Pending.label(), "Waiting for QR Scan");
        assert_eq!(DeviceStatus::Error.label(), "Connection Error");
        assert_eq!(DeviceStatus::from_filter("connected"), Some(DeviceStatus::Connected));
        assert_eq!(DeviceStatus::from_filter("all"), None);
    }

    #[test]
    fn test_campaign_validation() {
        let campaign = Campaign {
            id: "9".to_string(),
            name: "Broken".to_string(),
            status: CampaignStatus::Running,
            message: "hi".to_string(),
            recipient_count: 10,
            sent_count: 8,
            delivered_count: 6,
            read_count: 7,
            failed_count: 1,
            created_at: chrono::Utc::now(),
            scheduled_for: None,
            completed_at: None,
        };
        assert!(matches!(campaign.validate(), Err(CampaignError::ReadExceedsDelivered { .. })));
        assert_eq!(campaign.progress_percent(), 80);

        let over = Campaign { sent_count: 11, ..campaign.clone() };
        assert!(matches!(over.validate(), Err(CampaignError::SentExceedsRecipients { .. })));

        let outcomes = Campaign { delivered_count: 7, failed_count: 2, read_count: 0, ..campaign.clone() };
        assert!(matches!(outcomes.validate(), Err(CampaignError::OutcomesExceedSent { .. })));

        let empty = Campaign { recipient_count: 0, sent_count: 0, delivered_count: 0, read_count: 0, failed_count: 0, ..campaign };
        assert!(empty.validate().is_ok());
        assert_eq!(empty.progress_percent(), 0);
    }

    #[test]
    fn test_dashboard_stats() {
        let stats = fixtures::FixtureStore.stats();
        assert_eq!(stats.messages_today(), 3500);
        assert!(CampaignStatus::Scheduled.is_active());
        assert!(!CampaignStatus::Draft.is_active());
    }
}
