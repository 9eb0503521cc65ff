// Input validation for the dashboard forms.
// Failures abort the action and surface as a destructive toast.

use log::info;
use thiserror::Error;

use crate::fixtures::next_device_id;
use crate::models::Device;
use crate::notify::Toast;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormError {
    /// Add Device submitted with a blank name
    #[error("Device name cannot be empty")]
    EmptyDeviceName,

    #[error("Please enter a message to send")]
    EmptyMessage,

    #[error("Please select a device to send from")]
    NoDevice,

    /// Selected sender exists but is not paired
    #[error("Device {0} is not connected")]
    DeviceNotConnected(String),

    #[error("Please select at least one recipient")]
    NoRecipients,
}

impl FormError {
    pub fn title(&self) -> &'static str {
        match self {
            FormError::EmptyDeviceName => "Error",
            FormError::EmptyMessage => "Message required",
            FormError::NoDevice | FormError::DeviceNotConnected(_) => "Device required",
            FormError::NoRecipients => "Recipients required",
        }
    }

    pub fn to_toast(&self) -> Toast {
        Toast::error(self.title(), &self.to_string())
    }
}

pub fn validate_device_name(name: &str) -> Result<String, FormError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(FormError::EmptyDeviceName);
    }
    Ok(name.to_string())
}

/// Append a pending device with the next free id
pub fn add_device(devices: &mut Vec<Device>, name: &str) -> Result<Device, FormError> {
    let name = validate_device_name(name)?;
    let device = Device::pending(&next_device_id(devices), &name);
    info!("Added device {} ({})", device.name, device.id);
    devices.push(device.clone());
    Ok(device)
}

/// Message composer state shared by the single and bulk tabs
#[derive(Debug, Clone, Default)]
pub struct MessageDraft {
    pub content: String,
    pub device_id: Option<String>,
    pub recipients: Vec<String>,
}

/// A validated send request
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub device_id: String,
    pub content: String,
    pub recipients: Vec<String>,
}

impl Dispatch {
    pub fn summary(&self) -> String {
        format!("Message sent to {} recipient(s)", self.recipients.len())
    }
}

impl MessageDraft {
    pub fn toggle_recipient(&mut self, contact_id: &str) {
        if let Some(pos) = self.recipients.iter().position(|r| r == contact_id) {
            self.recipients.remove(pos);
        } else {
            self.recipients.push(contact_id.to_string());
        }
    }

    /// Single-recipient tab replaces the selection
    pub fn select_single(&mut self, contact_id: &str) {
        self.recipients = vec![contact_id.to_string()];
    }

    pub fn clear_recipients(&mut self) {
        self.recipients.clear();
    }

    pub fn is_selected(&self, contact_id: &str) -> bool {
        self.recipients.iter().any(|r| r == contact_id)
    }

    /// Checks run in the order the composer reports them
    pub fn validate(&self, devices: &[Device]) -> Result<Dispatch, FormError> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(FormError::EmptyMessage);
        }
        let device_id = match self.device_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => return Err(FormError::NoDevice),
        };
        match devices.iter().find(|d| d.id == device_id) {
            None => return Err(FormError::NoDevice),
            Some(d) if !d.is_connected() => return Err(FormError::DeviceNotConnected(d.name.clone())),
            Some(_) => {}
        }
        if self.recipients.is_empty() {
            return Err(FormError::NoRecipients);
        }
        Ok(Dispatch {
            device_id: device_id.to_string(),
            content: content.to_string(),
            recipients: self.recipients.clone(),
        })
    }
}
