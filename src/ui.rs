use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{debug, info};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Clear, Gauge, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
    Frame,
};
use std::{io, time::Duration};
use textwrap::wrap;
use tui_input::{backend::crossterm::EventHandler, Input};

use gateboard::fixtures::{filter_devices, message_history, search_campaigns, search_contacts, FixtureStore};
use gateboard::forms::{add_device, MessageDraft};
use gateboard::models::{CampaignStatus, Device, DeviceStatus};
use gateboard::notify::{NotificationSink, Toast, ToastKind, ToastQueue};
use gateboard::pairing::{Phase, SessionSnapshot};
use gateboard::routes::{Route, NAV};
use gateboard::utils::truncate;

// Export types needed by main module
pub use ratatui::backend::CrosstermBackend;
pub use ratatui::Terminal;

/// Requests the UI hands back to the main loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    Quit,
    OpenPairing { device_id: String, device_name: String },
    RefreshPairing,
    ClosePairing,
}

// Status filter cycle on the devices page
const FILTERS: [Option<DeviceStatus>; 5] = [
    None,
    Some(DeviceStatus::Connected),
    Some(DeviceStatus::Disconnected),
    Some(DeviceStatus::Pending),
    Some(DeviceStatus::Error),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComposeMode {
    Single,
    Bulk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Page,
    Search,
    Compose,
}

struct AddDeviceDialog {
    input: Input,
}

pub struct DashboardUI {
    route: Route,
    pub devices: Vec<Device>,
    toasts: ToastQueue,
    focus: Focus,
    search: Input,
    filter_index: usize,
    selected: usize,
    add_device_dialog: Option<AddDeviceDialog>,
    pairing: Option<SessionSnapshot>,
    compose_mode: ComposeMode,
    compose_input: Input,
    draft: MessageDraft,
}

impl DashboardUI {
    pub fn new(route: Route, toasts: ToastQueue) -> Self {
        DashboardUI {
            route,
            devices: FixtureStore.devices().to_vec(),
            toasts,
            focus: Focus::Page,
            search: Input::default(),
            filter_index: 0,
            selected: 0,
            add_device_dialog: None,
            pairing: None,
            compose_mode: ComposeMode::Single,
            compose_input: Input::default(),
            draft: MessageDraft::default(),
        }
    }

    pub fn route(&self) -> Route {
        self.route
    }

    pub fn navigate(&mut self, route: Route) {
        if route != self.route {
            debug!("Navigating to {}", route.path());
        }
        self.route = route;
        self.focus = Focus::Page;
        self.search.reset();
        self.selected = 0;
    }

    /// Latest pairing snapshot, or None once the modal is gone
    pub fn set_pairing(&mut self, snapshot: Option<SessionSnapshot>) {
        self.pairing = snapshot;
    }

    pub fn pairing_open(&self) -> bool {
        self.pairing.is_some()
    }

    pub fn connected_count(&self) -> usize {
        self.devices.iter().filter(|d| d.is_connected()).count()
    }

    fn status_filter(&self) -> Option<DeviceStatus> {
        FILTERS[self.filter_index % FILTERS.len()]
    }

    fn visible_devices(&self) -> Vec<&Device> {
        match self.route {
            Route::Dashboard => self.devices.iter().take(2).collect(),
            _ => filter_devices(&self.devices, self.search.value(), self.status_filter()),
        }
    }

    fn row_count(&self) -> usize {
        match self.route {
            Route::Dashboard | Route::Devices => self.visible_devices().len(),
            Route::Contacts | Route::Messages => search_contacts(FixtureStore.contacts(), self.search.value()).len(),
            Route::Campaigns => search_campaigns(FixtureStore.campaigns(), self.search.value()).len(),
            Route::NotFound => 0,
        }
    }

    fn selected_device(&self) -> Option<&Device> {
        self.visible_devices().get(self.selected).copied()
    }

    fn notify(&self, toast: Toast) {
        self.toasts.notify(toast);
    }

    pub fn clean_toasts(&self, timeout_secs: i64) {
        self.toasts.clean_expired(timeout_secs);
    }

    pub fn handle_input(&mut self) -> Result<Option<UiCommand>> {
        if event::poll(Duration::from_millis(10))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    return Ok(self.handle_key(key));
                }
            }
        }
        Ok(None)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Option<UiCommand> {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(UiCommand::Quit);
        }

        // Pairing modal swallows everything else
        if let Some(snapshot) = &self.pairing {
            return match key.code {
                KeyCode::Esc | KeyCode::Char('q') => Some(UiCommand::ClosePairing),
                KeyCode::Char('r') if !snapshot.loading && snapshot.phase != Phase::Connected => {
                    Some(UiCommand::RefreshPairing)
                }
                _ => None,
            };
        }

        if self.add_device_dialog.is_some() {
            return self.handle_add_device_key(key);
        }

        match self.focus {
            Focus::Search => {
                match key.code {
                    KeyCode::Esc | KeyCode::Enter => self.focus = Focus::Page,
                    _ => {
                        self.search.handle_event(&Event::Key(key));
                        self.selected = 0;
                    }
                }
                return None;
            }
            Focus::Compose => {
                match key.code {
                    KeyCode::Esc => self.focus = Focus::Page,
                    KeyCode::Enter => self.send_message(),
                    _ => {
                        self.compose_input.handle_event(&Event::Key(key));
                        self.draft.content = self.compose_input.value().to_string();
                    }
                }
                return None;
            }
            Focus::Page => {}
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Some(UiCommand::Quit),
            KeyCode::Tab => self.navigate(self.route.next()),
            KeyCode::BackTab => self.navigate(self.route.prev()),
            KeyCode::Char(c @ '1'..='5') => {
                let index = c as usize - '1' as usize;
                self.navigate(NAV[index]);
            }
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => {
                if self.selected + 1 < self.row_count() {
                    self.selected += 1;
                }
            }
            KeyCode::Char('/') if self.route != Route::Dashboard && self.route != Route::NotFound => {
                self.focus = Focus::Search;
            }
            _ => return self.handle_page_key(key),
        }
        None
    }

    fn handle_page_key(&mut self, key: KeyEvent) -> Option<UiCommand> {
        match (self.route, key.code) {
            (Route::Dashboard | Route::Devices, KeyCode::Char('s')) => {
                let device = self.selected_device()?;
                return Some(UiCommand::OpenPairing {
                    device_id: device.id.clone(),
                    device_name: device.name.clone(),
                });
            }
            (Route::Dashboard | Route::Devices, KeyCode::Char('c')) => {
                self.notify(Toast::info("Connecting device", "Attempting to connect to the WhatsApp servers..."));
            }
            (Route::Dashboard | Route::Devices, KeyCode::Char('x')) => {
                self.notify(Toast::info("Disconnecting device", "Device has been disconnected from WhatsApp servers."));
            }
            (Route::Dashboard, KeyCode::Char('a')) => {
                self.navigate(Route::Devices);
                self.add_device_dialog = Some(AddDeviceDialog { input: Input::default() });
            }
            (Route::Devices, KeyCode::Char('a')) => {
                self.add_device_dialog = Some(AddDeviceDialog { input: Input::default() });
            }
            (Route::Devices, KeyCode::Char('f')) => {
                self.filter_index = (self.filter_index + 1) % FILTERS.len();
                self.selected = 0;
            }
            (Route::Contacts, KeyCode::Char('a')) => {
                self.notify(Toast::info("Coming soon", "Add contact functionality will be available soon."));
            }
            (Route::Contacts, KeyCode::Char('i')) => {
                self.notify(Toast::info("Coming soon", "Contact import will be available soon."));
            }
            (Route::Contacts, KeyCode::Char('m')) => {
                self.notify(Toast::info("Sending message", "Opening message composer..."));
                self.navigate(Route::Messages);
            }
            (Route::Campaigns, KeyCode::Char('n')) => {
                self.notify(Toast::info("Coming soon", "Campaign creation will be available soon."));
            }
            (Route::Messages, KeyCode::Char('e')) => self.focus = Focus::Compose,
            (Route::Messages, KeyCode::Char('b')) => {
                self.compose_mode = match self.compose_mode {
                    ComposeMode::Single => ComposeMode::Bulk,
                    ComposeMode::Bulk => ComposeMode::Single,
                };
                self.draft.clear_recipients();
            }
            (Route::Messages, KeyCode::Char('d')) => self.cycle_sender(),
            (Route::Messages, KeyCode::Char(' ')) => self.pick_recipient(),
            (Route::Messages, KeyCode::Enter) => self.send_message(),
            _ => {}
        }
        None
    }

    fn handle_add_device_key(&mut self, key: KeyEvent) -> Option<UiCommand> {
        let dialog = self.add_device_dialog.as_mut()?;
        match key.code {
            KeyCode::Esc => {
                self.add_device_dialog = None;
                None
            }
            KeyCode::Enter => {
                let name = dialog.input.value().to_string();
                match add_device(&mut self.devices, &name) {
                    Ok(device) => {
                        self.add_device_dialog = None;
                        self.notify(Toast::info(
                            "Device added",
                            &format!("Device \"{}\" has been added successfully", device.name),
                        ));
                        Some(UiCommand::OpenPairing {
                            device_id: device.id,
                            device_name: device.name,
                        })
                    }
                    Err(e) => {
                        // dialog stays open for another try
                        self.notify(e.to_toast());
                        None
                    }
                }
            }
            _ => {
                dialog.input.handle_event(&Event::Key(key));
                None
            }
        }
    }

    /// Sender selector only offers connected devices
    fn cycle_sender(&mut self) {
        let connected: Vec<&Device> = self.devices.iter().filter(|d| d.is_connected()).collect();
        if connected.is_empty() {
            self.draft.device_id = None;
            return;
        }
        let next = match self.draft.device_id.as_deref() {
            Some(id) => connected
                .iter()
                .position(|d| d.id == id)
                .map(|i| (i + 1) % connected.len())
                .unwrap_or(0),
            None => 0,
        };
        self.draft.device_id = Some(connected[next].id.clone());
    }

    fn pick_recipient(&mut self) {
        let contacts = search_contacts(FixtureStore.contacts(), self.search.value());
        let Some(contact) = contacts.get(self.selected) else {
            return;
        };
        match self.compose_mode {
            ComposeMode::Single => self.draft.select_single(&contact.id),
            ComposeMode::Bulk => self.draft.toggle_recipient(&contact.id),
        }
    }

    fn send_message(&mut self) {
        match self.draft.validate(&self.devices) {
            Ok(dispatch) => {
                info!("Dispatching message from device {} to {:?}", dispatch.device_id, dispatch.recipients);
                self.notify(Toast::info("Message sent", &dispatch.summary()));
                self.compose_input.reset();
                self.draft.content.clear();
                self.focus = Focus::Page;
            }
            Err(e) => self.notify(e.to_toast()),
        }
    }

    pub fn draw<B: Backend>(&self, frame: &mut Frame<B>) {
        let size = frame.size();

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(22), // Sidebar
                Constraint::Min(40),    // Page
            ])
            .split(size);

        let page_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Min(5),    // Page body
                Constraint::Length(1), // Help line
            ])
            .split(chunks[1]);

        self.draw_sidebar(frame, chunks[0]);
        self.draw_header(frame, page_chunks[0]);

        match self.route {
            Route::Dashboard => self.draw_dashboard(frame, page_chunks[1]),
            Route::Devices => self.draw_devices(frame, page_chunks[1]),
            Route::Contacts => self.draw_contacts(frame, page_chunks[1]),
            Route::Messages => self.draw_messages(frame, page_chunks[1]),
            Route::Campaigns => self.draw_campaigns(frame, page_chunks[1]),
            Route::NotFound => draw_not_found(frame, page_chunks[1]),
        }

        let help = Paragraph::new(Line::from(Span::styled(self.help_text(), Style::default().fg(Color::Gray))));
        frame.render_widget(help, page_chunks[2]);

        if let Some(dialog) = &self.add_device_dialog {
            draw_add_device_dialog(frame, dialog, size);
        }

        if let Some(snapshot) = &self.pairing {
            draw_pairing_modal(frame, snapshot, size);
        }

        draw_toasts(frame, &self.toasts.visible(), size);
    }

    fn help_text(&self) -> &'static str {
        if self.pairing.is_some() {
            return "r refresh QR | Esc cancel";
        }
        if self.add_device_dialog.is_some() {
            return "Enter add | Esc cancel";
        }
        match (self.focus, self.route) {
            (Focus::Search, _) => "Type to search | Enter/Esc done",
            (Focus::Compose, _) => "Type message | Enter send | Esc done",
            (_, Route::Dashboard) => "q quit | Tab page | ↑↓ select | s scan QR | c connect | x disconnect | a add device",
            (_, Route::Devices) => "q quit | Tab page | / search | f filter | s scan QR | c/x connect | a add",
            (_, Route::Contacts) => "q quit | Tab page | / search | a add | i import | m message",
            (_, Route::Messages) => "q quit | Tab page | e edit | d device | b bulk | space pick | Enter send",
            (_, Route::Campaigns) => "q quit | Tab page | / search | n new campaign",
            (_, Route::NotFound) => "q quit | Tab back to dashboard",
        }
    }

    fn draw_sidebar<B: Backend>(&self, frame: &mut Frame<B>, area: Rect) {
        let items: Vec<ListItem> = NAV
            .iter()
            .enumerate()
            .map(|(i, route)| {
                let marker = if *route == self.route { "> " } else { "  " };
                let style = if *route == self.route {
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };
                ListItem::new(format!("{}{} {}", marker, i + 1, route.title())).style(style)
            })
            .collect();

        let sidebar = List::new(items).block(Block::default().title("WhatsApp Gateway").borders(Borders::ALL));
        frame.render_widget(sidebar, area);
    }

    fn draw_header<B: Backend>(&self, frame: &mut Frame<B>, area: Rect) {
        let header = Paragraph::new(Line::from(vec![
            Span::styled(self.route.title(), Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("   "),
            Span::styled(
                format!("{} device(s) connected", self.connected_count()),
                Style::default().fg(Color::Green),
            ),
        ]))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(header, area);
    }

    fn draw_dashboard<B: Backend>(&self, frame: &mut Frame<B>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(4)])
            .split(area);
        let cards = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Ratio(1, 4); 4])
            .split(rows[0]);

        let stats = FixtureStore.stats();
        let card_data = [
            (
                "Active Devices",
                stats.active_devices.to_string(),
                format!("{} of {} connected", stats.active_devices, stats.total_devices),
            ),
            ("Contacts", stats.total_contacts.to_string(), String::new()),
            (
                "Messages Today",
                stats.messages_today().to_string(),
                format!("Sent: {} · Received: {}", stats.messages_sent, stats.messages_received),
            ),
            ("Active Campaigns", stats.active_campaigns.to_string(), String::new()),
        ];
        for (i, (title, value, description)) in card_data.iter().enumerate() {
            draw_stat_card(frame, cards[i], title, value, description);
        }

        let mut devices = self.visible_devices();
        devices.truncate(2);
        let title = if self.devices.len() > 2 {
            "Connected Devices (Tab for all devices)"
        } else {
            "Connected Devices"
        };
        draw_device_list(frame, rows[1], &devices, self.selected, title);
    }

    fn draw_devices<B: Backend>(&self, frame: &mut Frame<B>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(area);

        let filter_label = self.status_filter().map(|s| s.label()).unwrap_or("All");
        self.draw_search(frame, chunks[0], &format!("Search devices [filter: {}]", filter_label));

        let devices = self.visible_devices();
        if devices.is_empty() {
            let empty = Paragraph::new("No devices found")
                .alignment(Alignment::Center)
                .block(Block::default().title("Devices").borders(Borders::ALL));
            frame.render_widget(empty, chunks[1]);
            return;
        }
        draw_device_list(frame, chunks[1], &devices, self.selected, "Devices");
    }

    fn draw_search<B: Backend>(&self, frame: &mut Frame<B>, area: Rect, title: &str) {
        let focused = self.focus == Focus::Search;
        let block = Block::default().title(title.to_string()).borders(Borders::ALL).border_style(if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        });
        frame.render_widget(Paragraph::new(self.search.value()).block(block), area);
        if focused {
            frame.set_cursor(area.x + self.search.cursor() as u16 + 1, area.y + 1);
        }
    }

    fn draw_contacts<B: Backend>(&self, frame: &mut Frame<B>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(area);
        self.draw_search(frame, chunks[0], "Search contacts");

        let contacts = search_contacts(FixtureStore.contacts(), self.search.value());
        if contacts.is_empty() {
            let empty = Paragraph::new("No contacts found")
                .alignment(Alignment::Center)
                .block(Block::default().title("Contacts").borders(Borders::ALL));
            frame.render_widget(empty, chunks[1]);
            return;
        }

        let rows: Vec<Row> = contacts
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let style = if i == self.selected {
                    Style::default().fg(Color::Yellow)
                } else {
                    Style::default()
                };
                Row::new(vec![
                    Cell::from(format!("({}) {}", c.initial(), c.name)),
                    Cell::from(c.phone_number.clone()),
                    Cell::from(c.kind_label()),
                    Cell::from(c.tags.join(", ")),
                    Cell::from(truncate(c.last_message.as_deref().unwrap_or("-"), 30)),
                ])
                .style(style)
            })
            .collect();

        let widths = [
            Constraint::Percentage(22),
            Constraint::Percentage(16),
            Constraint::Percentage(12),
            Constraint::Percentage(20),
            Constraint::Percentage(30),
        ];
        let table = Table::new(rows)
            .header(
                Row::new(vec!["Name", "Phone", "Type", "Tags", "Last Message"])
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            )
            .block(Block::default().title("Contacts").borders(Borders::ALL))
            .widths(&widths);
        frame.render_widget(table, chunks[1]);
    }

    fn draw_messages<B: Backend>(&self, frame: &mut Frame<B>, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Length(4), Constraint::Min(3)])
            .split(columns[0]);

        // Sender
        let sender = self
            .draft
            .device_id
            .as_deref()
            .and_then(|id| self.devices.iter().find(|d| d.id == id))
            .map(|d| d.name.as_str())
            .unwrap_or("Select a device (d)");
        let mode = match self.compose_mode {
            ComposeMode::Single => "Single",
            ComposeMode::Bulk => "Bulk",
        };
        let sender_widget = Paragraph::new(sender)
            .block(Block::default().title(format!("{} message · From", mode)).borders(Borders::ALL));
        frame.render_widget(sender_widget, left[0]);

        // Message body
        let focused = self.focus == Focus::Compose;
        let body_block = Block::default()
            .title("Message")
            .borders(Borders::ALL)
            .border_style(if focused { Style::default().fg(Color::Yellow) } else { Style::default() });
        let body = Paragraph::new(self.compose_input.value()).block(body_block).wrap(Wrap { trim: false });
        frame.render_widget(body, left[1]);
        if focused {
            frame.set_cursor(left[1].x + self.compose_input.cursor() as u16 + 1, left[1].y + 1);
        }

        // Recipients
        let contacts = search_contacts(FixtureStore.contacts(), self.search.value());
        let items: Vec<ListItem> = contacts
            .iter()
            .map(|c| {
                let mark = if self.draft.is_selected(&c.id) { "[x]" } else { "[ ]" };
                ListItem::new(format!("{} {} {}", mark, c.name, c.phone_number))
            })
            .collect();
        let mut state = ListState::default();
        if !items.is_empty() {
            state.select(Some(self.selected.min(items.len() - 1)));
        }
        let recipients = List::new(items)
            .block(
                Block::default()
                    .title(format!("Recipients ({} selected)", self.draft.recipients.len()))
                    .borders(Borders::ALL),
            )
            .highlight_style(Style::default().fg(Color::Yellow))
            .highlight_symbol("> ");
        frame.render_stateful_widget(recipients, left[2], &mut state);

        self.draw_history(frame, columns[1]);
    }

    fn draw_history<B: Backend>(&self, frame: &mut Frame<B>, area: Rect) {
        let history = message_history(FixtureStore.messages(), FixtureStore.contacts(), "");
        let width = area.width.saturating_sub(4).max(10) as usize;
        let mut items: Vec<ListItem> = Vec::new();
        for entry in &history {
            let arrow = if entry.outgoing { "→" } else { "←" };
            let status_color = match entry.status_label() {
                "failed" => Color::Red,
                "read" => Color::Blue,
                "received" => Color::Gray,
                _ => Color::Green,
            };
            let mut lines = vec![Line::from(vec![
                Span::styled(
                    format!("{} {} ", arrow, entry.contact_name()),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    entry.message.timestamp.format("%b %d %H:%M").to_string(),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(" "),
                Span::styled(entry.status_label(), Style::default().fg(status_color)),
            ])];
            for line in wrap(&entry.message.content, width) {
                lines.push(Line::from(line.into_owned()));
            }
            items.push(ListItem::new(lines));
        }

        let list = List::new(items).block(Block::default().title("Message History").borders(Borders::ALL));
        frame.render_widget(list, area);
    }

    fn draw_campaigns<B: Backend>(&self, frame: &mut Frame<B>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(3)])
            .split(area);
        self.draw_search(frame, chunks[0], "Search campaigns");

        let campaigns = search_campaigns(FixtureStore.campaigns(), self.search.value());
        let rows: Vec<Row> = campaigns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let status_color = match c.status {
                    CampaignStatus::Running => Color::Green,
                    CampaignStatus::Scheduled => Color::Blue,
                    CampaignStatus::Completed => Color::Gray,
                    CampaignStatus::Failed => Color::Red,
                    CampaignStatus::Draft => Color::Yellow,
                };
                let style = if i == self.selected {
                    Style::default().add_modifier(Modifier::REVERSED)
                } else {
                    Style::default()
                };
                Row::new(vec![
                    Cell::from(c.name.clone()),
                    Cell::from(c.status.as_str()).style(Style::default().fg(status_color)),
                    Cell::from(format!("{}/{} ({}%)", c.sent_count, c.recipient_count, c.progress_percent())),
                    Cell::from(format!("{} / {} / {}", c.delivered_count, c.read_count, c.failed_count)),
                    Cell::from(c.created_at.format("%b %d, %Y").to_string()),
                ])
                .style(style)
            })
            .collect();

        let widths = [
            Constraint::Percentage(28),
            Constraint::Percentage(12),
            Constraint::Percentage(20),
            Constraint::Percentage(22),
            Constraint::Percentage(18),
        ];
        let table = Table::new(rows)
            .header(
                Row::new(vec!["Name", "Status", "Progress", "Delivered/Read/Failed", "Created"])
                    .style(Style::default().add_modifier(Modifier::BOLD)),
            )
            .block(Block::default().title("Campaigns").borders(Borders::ALL))
            .widths(&widths);
        frame.render_widget(table, chunks[1]);
    }
}

fn status_color(status: DeviceStatus) -> Color {
    match status {
        DeviceStatus::Connected => Color::Green,
        DeviceStatus::Disconnected => Color::Gray,
        DeviceStatus::Pending => Color::Yellow,
        DeviceStatus::Error => Color::Red,
    }
}

fn draw_device_list<B: Backend>(f: &mut Frame<B>, area: Rect, devices: &[&Device], selected: usize, title: &str) {
    let items: Vec<ListItem> = devices
        .iter()
        .map(|d| {
            let last_active = d
                .last_active
                .map(|t| t.format("%b %d, %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string());
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(d.name.clone(), Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw("  "),
                    Span::styled(d.status.label(), Style::default().fg(status_color(d.status))),
                ]),
                Line::from(Span::styled(
                    format!("  {} · last active {}", d.phone_number.as_deref().unwrap_or("No number"), last_active),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();

    let mut state = ListState::default();
    if !items.is_empty() {
        state.select(Some(selected.min(items.len() - 1)));
    }
    let list = List::new(items)
        .block(Block::default().title(title.to_string()).borders(Borders::ALL))
        .highlight_symbol("> ")
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_stateful_widget(list, area, &mut state);
}

fn draw_stat_card<B: Backend>(f: &mut Frame<B>, area: Rect, title: &str, value: &str, description: &str) {
    let lines = vec![
        Line::from(Span::styled(value.to_string(), Style::default().add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(description.to_string(), Style::default().fg(Color::DarkGray))),
    ];
    let card = Paragraph::new(lines).block(Block::default().title(title.to_string()).borders(Borders::ALL));
    f.render_widget(card, area);
}

fn draw_not_found<B: Backend>(f: &mut Frame<B>, area: Rect) {
    let text = vec![
        Line::from(Span::styled("404", Style::default().add_modifier(Modifier::BOLD))),
        Line::from("Oops! Page not found"),
        Line::from("Press Tab to return to the dashboard"),
    ];
    let page = Paragraph::new(text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(page, area);
}

/// Rect of at most `width` x `height`, centered in `area`
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(2));
    Rect::new(
        area.x + (area.width.saturating_sub(width)) / 2,
        area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    )
}

fn draw_add_device_dialog<B: Backend>(f: &mut Frame<B>, dialog: &AddDeviceDialog, area: Rect) {
    let popup_area = centered_rect(50, 7, area);

    let popup_block = Block::default()
        .title("Add New Device")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    f.render_widget(Clear, popup_area);
    f.render_widget(popup_block, popup_area);

    let inner_area = popup_area.inner(&Margin {
        vertical: 1,
        horizontal: 2,
    });

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(3)])
        .split(inner_area);

    f.render_widget(Paragraph::new("Enter a name for the new device:"), chunks[0]);

    let input_widget = Paragraph::new(dialog.input.value())
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Blue)));
    f.render_widget(input_widget, chunks[1]);

    f.set_cursor(chunks[1].x + dialog.input.cursor() as u16 + 1, chunks[1].y + 1);
}

fn draw_pairing_modal<B: Backend>(f: &mut Frame<B>, snapshot: &SessionSnapshot, area: Rect) {
    let qr_height = snapshot.qr_image.as_ref().map(|q| q.height() as u16).unwrap_or(3);
    let qr_width = snapshot.qr_image.as_ref().map(|q| q.width() as u16).unwrap_or(0);
    let popup_area = centered_rect(qr_width.max(56) + 4, qr_height + 10, area);

    let popup_block = Block::default()
        .title(format!("Connect Device: {}", snapshot.device_name))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    f.render_widget(Clear, popup_area);
    f.render_widget(popup_block, popup_area);

    let inner_area = popup_area.inner(&Margin {
        vertical: 1,
        horizontal: 2,
    });

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),          // Description
            Constraint::Min(qr_height),     // QR code
            Constraint::Length(1),          // Status
            Constraint::Length(1),          // Attempts
            Constraint::Length(1),          // Keys
        ])
        .split(inner_area);

    f.render_widget(
        Paragraph::new("Scan this QR code with your WhatsApp app to connect this device.")
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(Color::Gray)),
        chunks[0],
    );

    let body = match (&snapshot.qr_image, snapshot.loading) {
        (_, true) => Paragraph::new("Generating QR code..."),
        (Some(image), false) => Paragraph::new(image.text.as_str()),
        (None, false) => Paragraph::new(match snapshot.phase {
            Phase::Connected => "Device linked",
            _ => "No QR code available",
        }),
    };
    f.render_widget(body.alignment(Alignment::Center), chunks[1]);

    let status_style = match snapshot.phase {
        Phase::Connected => Style::default().fg(Color::Green),
        Phase::Failed(_) => Style::default().fg(Color::Red),
        _ => Style::default(),
    };
    f.render_widget(
        Paragraph::new(snapshot.status.as_str()).alignment(Alignment::Center).style(status_style),
        chunks[2],
    );

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Green).bg(Color::DarkGray))
        .ratio(snapshot.progress())
        .label(format!("QR attempts {}/{}", snapshot.attempts, snapshot.max_attempts));
    f.render_widget(gauge, chunks[3]);

    let keys = if snapshot.loading { "Esc cancel" } else { "r refresh QR | Esc cancel" };
    f.render_widget(
        Paragraph::new(keys).alignment(Alignment::Right).style(Style::default().fg(Color::Gray)),
        chunks[4],
    );
}

fn draw_toasts<B: Backend>(f: &mut Frame<B>, toasts: &[Toast], area: Rect) {
    let popup_width = 44.min(area.width.saturating_sub(4));
    let popup_height = 4u16;
    let popup_x = area.width.saturating_sub(popup_width + 2);

    // newest on top
    for (i, toast) in toasts.iter().rev().enumerate() {
        let popup_y = 1 + i as u16 * popup_height;
        if popup_y + popup_height > area.height {
            break;
        }
        let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);
        let color = match toast.kind {
            ToastKind::Info => Color::Green,
            ToastKind::Destructive => Color::Red,
        };
        let block = Block::default()
            .title(toast.title.clone())
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color));
        let body = Paragraph::new(toast.description.as_str())
            .wrap(Wrap { trim: true })
            .block(block);
        f.render_widget(Clear, popup_area);
        f.render_widget(body, popup_area);
    }
}

pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

pub fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;

    fn press(ui: &mut DashboardUI, code: KeyCode) -> Option<UiCommand> {
        ui.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(ui: &mut DashboardUI, text: &str) {
        for c in text.chars() {
            press(ui, KeyCode::Char(c));
        }
    }

    fn render(ui: &DashboardUI) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| ui.draw(f)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer.content.iter().map(|c| c.symbol.as_str()).collect()
    }

    #[test]
    fn test_page_navigation() {
        let mut ui = DashboardUI::new(Route::Dashboard, ToastQueue::default());
        press(&mut ui, KeyCode::Tab);
        assert_eq!(ui.route(), Route::Devices);
        press(&mut ui, KeyCode::Char('5'));
        assert_eq!(ui.route(), Route::Campaigns);
        press(&mut ui, KeyCode::BackTab);
        assert_eq!(ui.route(), Route::Messages);
        assert_eq!(press(&mut ui, KeyCode::Char('q')), Some(UiCommand::Quit));
    }

    #[test]
    fn test_add_device_opens_pairing() {
        let toasts = ToastQueue::default();
        let mut ui = DashboardUI::new(Route::Devices, toasts.clone());
        press(&mut ui, KeyCode::Char('a'));

        // blank name keeps the dialog open
        assert_eq!(press(&mut ui, KeyCode::Enter), None);
        assert_eq!(toasts.visible()[0].description, "Device name cannot be empty");
        assert_eq!(ui.devices.len(), 4);

        type_text(&mut ui, "Sales");
        let command = press(&mut ui, KeyCode::Enter);
        assert_eq!(
            command,
            Some(UiCommand::OpenPairing {
                device_id: "5".to_string(),
                device_name: "Sales".to_string()
            })
        );
        assert_eq!(ui.devices.len(), 5);
    }

    #[test]
    fn test_pairing_modal_captures_keys() {
        let mut ui = DashboardUI::new(Route::Devices, ToastQueue::default());
        let command = press(&mut ui, KeyCode::Char('s'));
        assert!(matches!(command, Some(UiCommand::OpenPairing { ref device_id, .. }) if device_id == "1"));

        ui.set_pairing(Some(SessionSnapshot {
            device_id: Some("1".to_string()),
            device_name: "Primary Phone".to_string(),
            phase: Phase::Initializing,
            attempts: 0,
            max_attempts: 5,
            status: "Initializing connection...".to_string(),
            qr_payload: None,
            qr_image: None,
            loading: true,
            closed: false,
        }));
        // refresh is disabled while loading
        assert_eq!(press(&mut ui, KeyCode::Char('r')), None);
        assert_eq!(press(&mut ui, KeyCode::Tab), None);
        assert_eq!(ui.route(), Route::Devices);
        assert_eq!(press(&mut ui, KeyCode::Esc), Some(UiCommand::ClosePairing));

        let screen = render(&ui);
        assert!(screen.contains("Connect Device: Primary Phone"));
        assert!(screen.contains("Generating QR code..."));
    }

    #[test]
    fn test_compose_validation_toasts() {
        let toasts = ToastQueue::default();
        let mut ui = DashboardUI::new(Route::Messages, toasts.clone());
        press(&mut ui, KeyCode::Enter);
        assert_eq!(toasts.visible()[0].title, "Message required");

        press(&mut ui, KeyCode::Char('e'));
        type_text(&mut ui, "Hello there");
        press(&mut ui, KeyCode::Esc);
        press(&mut ui, KeyCode::Enter);
        assert_eq!(toasts.visible()[1].title, "Device required");

        press(&mut ui, KeyCode::Char('d'));
        press(&mut ui, KeyCode::Enter);
        assert_eq!(toasts.visible()[2].title, "Recipients required");

        press(&mut ui, KeyCode::Char(' '));
        press(&mut ui, KeyCode::Enter);
        assert_eq!(toasts.visible()[3].description, "Message sent to 1 recipient(s)");
    }

    #[test]
    fn test_search_filters_contacts() {
        let mut ui = DashboardUI::new(Route::Contacts, ToastQueue::default());
        press(&mut ui, KeyCode::Char('/'));
        type_text(&mut ui, "zzz");
        press(&mut ui, KeyCode::Enter);
        assert!(render(&ui).contains("No contacts found"));
    }

    #[test]
    fn test_render_pages() {
        let ui = DashboardUI::new(Route::Dashboard, ToastQueue::default());
        let screen = render(&ui);
        assert!(screen.contains("Active Devices"));
        assert!(screen.contains("1 of 4 connected"));

        let ui = DashboardUI::new(Route::NotFound, ToastQueue::default());
        assert!(render(&ui).contains("Oops! Page not found"));
    }
}
