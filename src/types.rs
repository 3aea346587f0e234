use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackupSchedule {
    pub day: Option<String>,
    pub window: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinodeBackups {
    pub enabled: bool,
    #[serde(default)]
    pub schedule: BackupSchedule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinodeSpecs {
    pub memory: u64,
    pub disk: u64,
    pub vcpus: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Linode {
    pub id: u64,
    pub label: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub region: String,
    pub status: String,
    pub created: Option<DateTime<Utc>>,
    pub image: Option<String>,
    #[serde(rename = "type")]
    pub type_id: Option<String>,
    pub specs: LinodeSpecs,
    pub backups: LinodeBackups,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    pub id: u64,
    pub label: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub size: u64,
    pub region: String,
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeBalancer {
    pub id: u64,
    pub label: String,
    // Older API versions omit tags on nodebalancers entirely.
    #[serde(default)]
    pub tags: Vec<String>,
    pub hostname: String,
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Domain {
    pub id: u64,
    pub domain: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub is_public: bool,
    pub created: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinodeType {
    pub id: String,
    pub label: String,
    pub memory: u64,
    pub disk: u64,
    pub vcpus: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSettings {
    pub backups_enabled: bool,
}

/// Monthly transfer pool for the whole account, in GB.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkUtilization {
    pub used: u64,
    pub quota: u64,
    pub billable: u64,
}

impl NetworkUtilization {
    /// Percentage of the pool consumed, floored. Anything under one
    /// percent renders as "<1%" rather than rounding down to zero.
    pub fn pool_usage_display(&self) -> String {
        if self.quota == 0 {
            return "0%".to_string();
        }
        let pct = self.used as f64 / self.quota as f64 * 100.0;
        if pct < 1.0 {
            "<1%".to_string()
        } else {
            format!("{}%", pct.floor() as u64)
        }
    }
}

/// Paginated envelope every list endpoint responds with.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub page: u64,
    pub pages: u64,
    pub results: u64,
}

/// Error body the API returns on non-2xx responses. The first entry's
/// `reason` is the human-readable message shown to the user.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub errors: Vec<ApiErrorReason>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorReason {
    pub reason: String,
    pub field: Option<String>,
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.errors.first() {
            Some(e) => write!(f, "{}", e.reason),
            None => write!(f, "Unknown API error"),
        }
    }
}

impl std::error::Error for ApiErrorResponse {}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Loading,
    Dashboard,
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputMode {
    Normal,
    Editing,
}
