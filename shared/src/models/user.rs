//! User account and preference models

use serde::{Deserialize, Serialize};

/// Layout the frontend opens list pages in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "backend", derive(sqlx::Type, utoipa::ToSchema))]
#[cfg_attr(
    feature = "backend",
    sqlx(type_name = "default_view", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DefaultView {
    #[default]
    List,
    Grid,
    Calendar,
}

/// Per-user display and notification settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferenceDefaults {
    pub items_per_page: i32,
    pub default_view: DefaultView,
    pub low_stock_alerts: bool,
    pub order_status_notifications: bool,
    pub inventory_count_reminders: bool,
    pub date_format: String,
    pub time_format: String,
    pub timezone: String,
}

impl Default for PreferenceDefaults {
    fn default() -> Self {
        Self {
            items_per_page: 20,
            default_view: DefaultView::List,
            low_stock_alerts: true,
            order_status_notifications: true,
            inventory_count_reminders: true,
            date_format: "YYYY-MM-DD".to_string(),
            time_format: "HH:mm".to_string(),
            timezone: "UTC".to_string(),
        }
    }
}

/// Upper bound on the per-page preference, matching the list endpoints
pub const MAX_ITEMS_PER_PAGE: i32 = 100;

/// Display name: full name when set, otherwise the username
pub fn display_name(username: &str, first_name: &str, last_name: &str) -> String {
    let full = format!("{} {}", first_name.trim(), last_name.trim());
    let full = full.trim();
    if full.is_empty() {
        username.to_string()
    } else {
        full.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("jdoe", "Jane", "Doe"), "Jane Doe");
        assert_eq!(display_name("jdoe", "Jane", ""), "Jane");
        assert_eq!(display_name("jdoe", " ", ""), "jdoe");
    }

    #[test]
    fn test_preference_defaults() {
        let prefs = PreferenceDefaults::default();
        assert_eq!(prefs.items_per_page, 20);
        assert_eq!(prefs.default_view, DefaultView::List);
        assert!(prefs.low_stock_alerts);
    }
}
