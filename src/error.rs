use thiserror::Error;

/// Acquisition strategy that produced an error, for logging and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Broker,
    Direct,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Broker => "broker",
            Strategy::Direct => "direct",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error produced by one acquisition cycle.
///
/// The same value is fanned out to every caller queued on the cycle, so all
/// variants are `Clone` and carry their causes as rendered strings rather
/// than as live `reqwest` errors.
#[derive(Debug, Clone, Error)]
pub enum AcquireError {
    /// Credentials are missing or incomplete. Never auto-retried.
    #[error("credential configuration invalid: {0}")]
    Configuration(String),

    /// One exchange failed; the cycle falls back to the next strategy.
    #[error("{strategy} exchange failed: {reason}")]
    Transient { strategy: Strategy, reason: String },

    /// Both strategies exhausted in this cycle.
    #[error("all acquisition strategies failed (broker: {broker}; direct: {direct})")]
    Terminal { broker: String, direct: String },
}

impl AcquireError {
    pub fn transient(strategy: Strategy, reason: impl Into<String>) -> Self {
        AcquireError::Transient {
            strategy,
            reason: reason.into(),
        }
    }
}

/// Validation failure detail. Stays inside the validator: callers only ever
/// see it as a returned value, malformed input never panics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("token is not a decodable three-segment bearer token")]
    Malformed,
    #[error("token is expired")]
    Expired,
    #[error("token issuer '{found}' does not match expected '{expected}'")]
    IssuerMismatch { expected: String, found: String },
    #[error("token audience does not include the expected audience '{expected}'")]
    AudienceMismatch { expected: String },
}
