#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Dashboard,
    Devices,
    Contacts,
    Messages,
    Campaigns,
    NotFound,
}

/// Sidebar order
pub const NAV: [Route; 5] = [
    Route::Dashboard,
    Route::Devices,
    Route::Contacts,
    Route::Messages,
    Route::Campaigns,
];

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Dashboard => "/",
            Route::Devices => "/devices",
            Route::Contacts => "/contacts",
            Route::Messages => "/messages",
            Route::Campaigns => "/campaigns",
            Route::NotFound => "*",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Route::Dashboard => "Dashboard",
            Route::Devices => "Devices",
            Route::Contacts => "Contacts",
            Route::Messages => "Messages",
            Route::Campaigns => "Campaigns",
            Route::NotFound => "Not Found",
        }
    }

    /// Unknown paths resolve to NotFound. A trailing slash is tolerated.
    pub fn from_path(path: &str) -> Route {
        let trimmed = path.trim();
        let normalized = if trimmed.len() > 1 { trimmed.trim_end_matches('/') } else { trimmed };
        NAV.iter()
            .copied()
            .find(|r| r.path() == normalized)
            .unwrap_or(Route::NotFound)
    }

    fn nav_index(&self) -> Option<usize> {
        NAV.iter().position(|r| r == self)
    }

    pub fn next(&self) -> Route {
        match self.nav_index() {
            Some(i) => NAV[(i + 1) % NAV.len()],
            None => Route::Dashboard,
        }
    }

    pub fn prev(&self) -> Route {
        match self.nav_index() {
            Some(i) => NAV[(i + NAV.len() - 1) % NAV.len()],
            None => Route::Dashboard,
        }
    }
}
