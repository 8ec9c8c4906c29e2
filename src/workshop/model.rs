//! Workshop directory models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Workshop {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub phone: Option<String>,
    pub services: Vec<String>,
    pub open_hours: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body of `POST /workshops` and `PUT /workshops/:id`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WorkshopRequest {
    #[validate(length(min = 1, max = 120, message = "name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 300, message = "address is required"))]
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub phone: Option<String>,
    #[serde(default)]
    pub services: Vec<String>,
    pub open_hours: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListWorkshopsQuery {
    /// Case-insensitive match on name, address or services
    pub q: Option<String>,
}

impl Workshop {
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle)
            || self.address.to_lowercase().contains(&needle)
            || self
                .services
                .iter()
                .any(|s| s.to_lowercase().contains(&needle))
    }
}
