use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    Connected,
    Disconnected,
    Pending, // Waiting for a QR scan
    Error,
}

impl DeviceStatus {
    /// Label shown on device cards
    pub fn label(&self) -> &'static str {
        match self {
            DeviceStatus::Connected => "Connected",
            DeviceStatus::Disconnected => "Disconnected",
            DeviceStatus::Pending => "Waiting for QR Scan",
            DeviceStatus::Error => "Connection Error",
        }
    }

    /// Parse the lowercase filter value used by the status selector
    pub fn from_filter(value: &str) -> Option<Self> {
        match value {
            "connected" => Some(DeviceStatus::Connected),
            "disconnected" => Some(DeviceStatus::Disconnected),
            "pending" => Some(DeviceStatus::Pending),
            "error" => Some(DeviceStatus::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub status: DeviceStatus,
    pub phone_number: Option<String>,
    pub last_active: Option<DateTime<Utc>>,
    pub qr_code: Option<String>,
}

impl Device {
    /// A freshly added device that still has to be paired
    pub fn pending(id: &str, name: &str) -> Self {
        Device {
            id: id.to_string(),
            name: name.to_string(),
            status: DeviceStatus::Pending,
            phone_number: None,
            last_active: None,
            qr_code: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == DeviceStatus::Connected
    }
}

#[derive(Debug, Clone)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub phone_number: String,
    pub last_message: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
    pub is_group: bool,
    pub avatar: Option<String>,
    pub tags: Vec<String>,
}

impl Contact {
    pub fn kind_label(&self) -> &'static str {
        if self.is_group { "Group" } else { "Individual" }
    }

    /// First character of the name, used where an avatar would be drawn
    pub fn initial(&self) -> char {
        self.name.chars().next().unwrap_or('?')
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum DeliveryStatus {
    Sent = 1,      // Accepted by the gateway
    Delivered = 2, // Delivered to recipient's device
    Read = 3,      // Read by recipient
    Failed = 4,    // Failed to send
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::Read => "read",
            DeliveryStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum MediaType {
    Image,
    Video,
    Document,
    Audio,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub sender: String,
    pub recipient: String,
    pub status: DeliveryStatus,
    pub media_url: Option<String>,
    pub media_type: Option<MediaType>,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Running,
    Completed,
    Failed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Scheduled => "scheduled",
            CampaignStatus::Running => "running",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Failed => "failed",
        }
    }

    /// Running and scheduled campaigns count as active on the dashboard
    pub fn is_active(&self) -> bool {
        matches!(self, CampaignStatus::Running | CampaignStatus::Scheduled)
    }
}

/// Counter inconsistencies a campaign record can carry
#[derive(Debug, Error, PartialEq)]
pub enum CampaignError {
    #[error("campaign {id}: sent count {sent} exceeds recipient count {recipients}")]
    SentExceedsRecipients { id: String, sent: u32, recipients: u32 },

    #[error("campaign {id}: delivered ({delivered}) + failed ({failed}) exceeds sent count {sent}")]
    OutcomesExceedSent { id: String, delivered: u32, failed: u32, sent: u32 },

    #[error("campaign {id}: read count {read} exceeds delivered count {delivered}")]
    ReadExceedsDelivered { id: String, read: u32, delivered: u32 },
}

#[derive(Debug, Clone)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub status: CampaignStatus,
    pub message: String,
    pub recipient_count: u32,
    pub sent_count: u32,
    pub delivered_count: u32,
    pub read_count: u32,
    pub failed_count: u32,
    pub created_at: DateTime<Utc>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Campaign {
    /// Check the denormalized counters against each other
    pub fn validate(&self) -> Result<(), CampaignError> {
        if self.sent_count > self.recipient_count {
            return Err(CampaignError::SentExceedsRecipients {
                id: self.id.clone(),
                sent: self.sent_count,
                recipients: self.recipient_count,
            });
        }
        // u64 so two large u32 counters can't wrap
        if self.delivered_count as u64 + self.failed_count as u64 > self.sent_count as u64 {
            return Err(CampaignError::OutcomesExceedSent {
                id: self.id.clone(),
                delivered: self.delivered_count,
                failed: self.failed_count,
                sent: self.sent_count,
            });
        }
        if self.read_count > self.delivered_count {
            return Err(CampaignError::ReadExceedsDelivered {
                id: self.id.clone(),
                read: self.read_count,
                delivered: self.delivered_count,
            });
        }
        Ok(())
    }

    /// Sent share of recipients, 0..=100
    pub fn progress_percent(&self) -> u16 {
        if self.recipient_count == 0 {
            return 0;
        }
        let pct = self.sent_count as u64 * 100 / self.recipient_count as u64;
        pct.min(100) as u16
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DashboardStats {
    pub total_devices: u32,
    pub active_devices: u32,
    pub total_contacts: u32,
    pub total_messages: u32,
    pub messages_sent: u32,
    pub messages_received: u32,
    pub active_campaigns: u32,
}

impl DashboardStats {
    pub fn messages_today(&self) -> u32 {
        self.messages_sent + self.messages_received
    }
}
