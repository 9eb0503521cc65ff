// Static sample data standing in for a gateway backend.
// Everything here is built once and never mutated.

use chrono::{DateTime, TimeZone, Utc};
use regex::Regex;

use crate::models::{
    Campaign, CampaignStatus, Contact, DashboardStats, DeliveryStatus, Device, DeviceStatus,
    MediaType, Message,
};

fn at(year: i32, month: u32, day: u32, hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, 0)
        .single()
        .unwrap_or_default()
}

fn tags(list: &[&str]) -> Vec<String> {
    list.iter().map(|t| t.to_string()).collect()
}

lazy_static::lazy_static! {
    static ref DEVICES: Vec<Device> = vec![
        Device {
            id: "1".to_string(),
            name: "Primary Phone".to_string(),
            status: DeviceStatus::Connected,
            phone_number: Some("+1234567890".to_string()),
            last_active: Some(at(2023, 6, 15, 8, 30)),
            qr_code: None,
        },
        Device {
            id: "2".to_string(),
            name: "Support Device".to_string(),
            status: DeviceStatus::Disconnected,
            phone_number: Some("+1987654321".to_string()),
            last_active: Some(at(2023, 6, 10, 15, 45)),
            qr_code: None,
        },
        Device {
            id: "3".to_string(),
            name: "Marketing Phone".to_string(),
            status: DeviceStatus::Pending,
            phone_number: None,
            last_active: None,
            qr_code: Some("gateboard://pair/3/example".to_string()),
        },
        Device {
            id: "4".to_string(),
            name: "Sales Device".to_string(),
            status: DeviceStatus::Error,
            phone_number: Some("+1122334455".to_string()),
            last_active: Some(at(2023, 6, 12, 11, 20)),
            qr_code: None,
        },
    ];

    static ref CONTACTS: Vec<Contact> = vec![
        Contact {
            id: "1".to_string(),
            name: "John Doe".to_string(),
            phone_number: "+1234567890".to_string(),
            last_message: Some("Hey, how are you?".to_string()),
            last_message_time: Some(at(2023, 6, 15, 10, 30)),
            is_group: false,
            avatar: Some("https://i.pravatar.cc/150?img=1".to_string()),
            tags: tags(&["customer", "premium"]),
        },
        Contact {
            id: "2".to_string(),
            name: "Marketing Team".to_string(),
            phone_number: "+1987654321".to_string(),
            last_message: Some("Meeting at 2pm tomorrow".to_string()),
            last_message_time: Some(at(2023, 6, 15, 9, 15)),
            is_group: true,
            avatar: Some("https://i.pravatar.cc/150?img=2".to_string()),
            tags: tags(&["team", "internal"]),
        },
        Contact {
            id: "3".to_string(),
            name: "Alice Smith".to_string(),
            phone_number: "+1122334455".to_string(),
            last_message: Some("Please send the invoice".to_string()),
            last_message_time: Some(at(2023, 6, 14, 16, 45)),
            is_group: false,
            avatar: Some("https://i.pravatar.cc/150?img=3".to_string()),
            tags: tags(&["customer", "new"]),
        },
        Contact {
            id: "4".to_string(),
            name: "Support Group".to_string(),
            phone_number: "+1555666777".to_string(),
            last_message: Some("New ticket #1234".to_string()),
            last_message_time: Some(at(2023, 6, 15, 11, 0)),
            is_group: true,
            avatar: Some("https://i.pravatar.cc/150?img=4".to_string()),
            tags: tags(&["team", "support"]),
        },
        Contact {
            id: "5".to_string(),
            name: "Bob Johnson".to_string(),
            phone_number: "+1999888777".to_string(),
            last_message: Some("Thanks for your help".to_string()),
            last_message_time: Some(at(2023, 6, 13, 14, 20)),
            is_group: false,
            avatar: Some("https://i.pravatar.cc/150?img=5".to_string()),
            tags: tags(&["customer"]),
        },
    ];

    static ref MESSAGES: Vec<Message> = vec![
        Message {
            id: "1".to_string(),
            content: "Hey, how are you?".to_string(),
            timestamp: at(2023, 6, 15, 10, 30),
            sender: "+1234567890".to_string(),
            recipient: "+1987654321".to_string(),
            status: DeliveryStatus::Read,
            media_url: None,
            media_type: None,
        },
        Message {
            id: "2".to_string(),
            content: "I'm good, thanks! How about you?".to_string(),
            timestamp: at(2023, 6, 15, 10, 32),
            sender: "+1987654321".to_string(),
            recipient: "+1234567890".to_string(),
            status: DeliveryStatus::Delivered,
            media_url: None,
            media_type: None,
        },
        Message {
            id: "3".to_string(),
            content: "Check out this new product".to_string(),
            timestamp: at(2023, 6, 15, 9, 15),
            sender: "+1122334455".to_string(),
            recipient: "+1234567890".to_string(),
            status: DeliveryStatus::Sent,
            media_url: Some("https://via.placeholder.com/300".to_string()),
            media_type: Some(MediaType::Image),
        },
        Message {
            id: "4".to_string(),
            content: "Meeting at 2pm tomorrow".to_string(),
            timestamp: at(2023, 6, 15, 9, 15),
            sender: "+1555666777".to_string(),
            recipient: "+1987654321".to_string(),
            status: DeliveryStatus::Failed,
            media_url: None,
            media_type: None,
        },
        Message {
            id: "5".to_string(),
            content: "Please send the invoice".to_string(),
            timestamp: at(2023, 6, 14, 16, 45),
            sender: "+1234567890".to_string(),
            recipient: "+1122334455".to_string(),
            status: DeliveryStatus::Read,
            media_url: None,
            media_type: None,
        },
    ];

    static ref CAMPAIGNS: Vec<Campaign> = vec![
        Campaign {
            id: "1".to_string(),
            name: "Summer Sale Promotion".to_string(),
            status: CampaignStatus::Completed,
            message: "Get 30% off on all products this summer! Shop now: https://example.com/summer-sale".to_string(),
            recipient_count: 1000,
            sent_count: 1000,
            delivered_count: 950,
            read_count: 800,
            failed_count: 50,
            created_at: at(2023, 6, 1, 8, 0),
            scheduled_for: None,
            completed_at: Some(at(2023, 6, 1, 9, 30)),
        },
        Campaign {
            id: "2".to_string(),
            name: "Customer Feedback Survey".to_string(),
            status: CampaignStatus::Running,
            message: "We value your opinion! Please take a moment to fill out our survey: https://example.com/survey".to_string(),
            recipient_count: 500,
            sent_count: 300,
            delivered_count: 290,
            read_count: 150,
            failed_count: 10,
            created_at: at(2023, 6, 15, 10, 0),
            scheduled_for: None,
            completed_at: None,
        },
        Campaign {
            id: "3".to_string(),
            name: "New Product Launch".to_string(),
            status: CampaignStatus::Scheduled,
            message: "Exciting news! Our new product is launching next week. Be the first to know: https://example.com/new-product".to_string(),
            recipient_count: 2000,
            sent_count: 0,
            delivered_count: 0,
            read_count: 0,
            failed_count: 0,
            created_at: at(2023, 6, 15, 14, 30),
            scheduled_for: Some(at(2023, 6, 20, 9, 0)),
            completed_at: None,
        },
        Campaign {
            id: "4".to_string(),
            name: "Holiday Greetings".to_string(),
            status: CampaignStatus::Draft,
            message: "Happy holidays from our team to yours! Enjoy this special discount code: HOLIDAY2023".to_string(),
            recipient_count: 1500,
            sent_count: 0,
            delivered_count: 0,
            read_count: 0,
            failed_count: 0,
            created_at: at(2023, 6, 14, 11, 45),
            scheduled_for: None,
            completed_at: None,
        },
    ];

    static ref PHONE_NOISE: Regex = Regex::new(r"[\s\-().]").unwrap();
}

const STATS: DashboardStats = DashboardStats {
    total_devices: 4,
    active_devices: 1,
    total_contacts: 324,
    total_messages: 3500,
    messages_sent: 2100,
    messages_received: 1400,
    active_campaigns: 2,
};

/// Read-only accessor over the fixture collections
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureStore;

impl FixtureStore {
    pub fn devices(&self) -> &'static [Device] {
        &DEVICES
    }

    pub fn find_device(&self, id: &str) -> Option<&'static Device> {
        DEVICES.iter().find(|d| d.id == id)
    }

    pub fn connected_devices(&self) -> Vec<&'static Device> {
        DEVICES.iter().filter(|d| d.is_connected()).collect()
    }

    pub fn contacts(&self) -> &'static [Contact] {
        &CONTACTS
    }

    pub fn find_contact(&self, id: &str) -> Option<&'static Contact> {
        CONTACTS.iter().find(|c| c.id == id)
    }

    pub fn messages(&self) -> &'static [Message] {
        &MESSAGES
    }

    pub fn campaigns(&self) -> &'static [Campaign] {
        &CAMPAIGNS
    }

    pub fn stats(&self) -> DashboardStats {
        STATS
    }
}

/// Strip formatting characters so "+1 (234) 567-890" matches "+1234567890"
pub fn normalize_phone(phone: &str) -> String {
    PHONE_NOISE.replace_all(phone.trim(), "").into_owned()
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

/// Next numeric id after the highest one in use
pub fn next_device_id(devices: &[Device]) -> String {
    let max = devices
        .iter()
        .filter_map(|d| d.id.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    (max + 1).to_string()
}

pub fn filter_devices<'a>(
    devices: &'a [Device],
    term: &str,
    status: Option<DeviceStatus>,
) -> Vec<&'a Device> {
    let needle = term.trim().to_lowercase();
    let phone_needle = normalize_phone(term);
    devices
        .iter()
        .filter(|d| status.map_or(true, |s| d.status == s))
        .filter(|d| {
            needle.is_empty()
                || contains_ci(&d.name, &needle)
                || d.phone_number.as_deref().map_or(false, |p| {
                    !phone_needle.is_empty() && normalize_phone(p).contains(&phone_needle)
                })
        })
        .collect()
}

pub fn search_contacts<'a>(contacts: &'a [Contact], term: &str) -> Vec<&'a Contact> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return contacts.iter().collect();
    }
    let phone_needle = normalize_phone(term);
    contacts
        .iter()
        .filter(|c| {
            contains_ci(&c.name, &needle)
                || (!phone_needle.is_empty() && normalize_phone(&c.phone_number).contains(&phone_needle))
                || c.tags.iter().any(|t| contains_ci(t, &needle))
        })
        .collect()
}

pub fn search_campaigns<'a>(campaigns: &'a [Campaign], term: &str) -> Vec<&'a Campaign> {
    let needle = term.trim().to_lowercase();
    campaigns
        .iter()
        .filter(|c| needle.is_empty() || contains_ci(&c.name, &needle) || contains_ci(&c.message, &needle))
        .collect()
}

/// One row of the message history panel
#[derive(Debug, Clone)]
pub struct HistoryEntry<'a> {
    pub message: &'a Message,
    pub contact: Option<&'a Contact>,
    /// false when the counterpart contact is the sender
    pub outgoing: bool,
}

impl<'a> HistoryEntry<'a> {
    pub fn contact_name(&self) -> &str {
        self.contact.map(|c| c.name.as_str()).unwrap_or("Unknown")
    }

    pub fn status_label(&self) -> &'static str {
        if self.outgoing { self.message.status.as_str() } else { "received" }
    }
}

/// Pair each message with the first contact on either end of it
pub fn message_history<'a>(
    messages: &'a [Message],
    contacts: &'a [Contact],
    term: &str,
) -> Vec<HistoryEntry<'a>> {
    let needle = term.trim().to_lowercase();
    messages
        .iter()
        .filter(|m| needle.is_empty() || contains_ci(&m.content, &needle))
        .map(|m| {
            let sender = normalize_phone(&m.sender);
            let recipient = normalize_phone(&m.recipient);
            let contact = contacts.iter().find(|c| {
                let phone = normalize_phone(&c.phone_number);
                phone == sender || phone == recipient
            });
            let outgoing = contact.map_or(true, |c| normalize_phone(&c.phone_number) != sender);
            HistoryEntry { message: m, contact, outgoing }
        })
        .collect()
}
