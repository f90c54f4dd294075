use serde::Serialize;

/// Health state machine driven by the renewal manager's periodic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// No check has run yet.
    Unknown,
    Healthy,
    /// Inside the renewal window; a renewal has been triggered.
    RenewalNeeded,
    Expired,
    /// Last renewal attempt failed; a retry is scheduled.
    Error,
    /// Renewal just succeeded; re-evaluates to healthy on the next tick.
    Renewed,
    NoToken,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Unknown => "unknown",
            HealthStatus::Healthy => "healthy",
            HealthStatus::RenewalNeeded => "renewal_needed",
            HealthStatus::Expired => "expired",
            HealthStatus::Error => "error",
            HealthStatus::Renewed => "renewed",
            HealthStatus::NoToken => "no_token",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owned exclusively by the renewal manager; everyone else reads snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct HealthRecord {
    pub status: HealthStatus,
    pub last_check_at: Option<i64>,
    pub refresh_count: u64,
    pub error_count: u64,
    pub last_error: Option<String>,
}

impl Default for HealthRecord {
    fn default() -> Self {
        Self {
            status: HealthStatus::Unknown,
            last_check_at: None,
            refresh_count: 0,
            error_count: 0,
            last_error: None,
        }
    }
}

/// Combined read-only view of the health record and the cached token.
#[derive(Debug, Clone, Serialize)]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    pub is_valid: bool,
    pub expires_at: Option<i64>,
    pub time_to_expiry: Option<i64>,
    pub refresh_count: u64,
    pub error_count: u64,
    pub last_error: Option<String>,
    pub uptime: u64,
}
