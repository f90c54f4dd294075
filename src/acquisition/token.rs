use crate::error::Strategy;
use crate::helpers::time::now_i64;
use serde::Serialize;

/// The one token the coordinator holds, plus the metadata that decides
/// whether it may still be served from cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub value: String,
    pub token_type: String,
    pub issued_at: i64,
    pub expires_at: i64,
    pub last_refresh_at: i64,
    /// Which strategy produced this token, for renewal events and logs.
    pub acquired_via: Strategy,
}

impl CachedToken {
    pub fn new(
        value: impl Into<String>,
        token_type: impl Into<String>,
        expires_at: i64,
        acquired_via: Strategy,
    ) -> Self {
        let now = now_i64();
        Self {
            value: value.into(),
            token_type: token_type.into(),
            issued_at: now,
            expires_at,
            last_refresh_at: now,
            acquired_via,
        }
    }

    /// A token is served from cache only while it clears the safety buffer
    /// before nominal expiry AND stays under the hard age ceiling, which is
    /// independent of whatever lifetime the provider declared.
    pub fn is_usable(&self, safety_buffer_seconds: u64, max_age_seconds: u64) -> bool {
        let now = now_i64();
        now + (safety_buffer_seconds as i64) < self.expires_at
            && now - self.last_refresh_at < max_age_seconds as i64
    }

    pub fn time_to_expiry(&self) -> i64 {
        self.expires_at - now_i64()
    }

    pub fn info(&self) -> TokenInfo {
        TokenInfo {
            expires_at: self.expires_at,
            token_type: self.token_type.clone(),
        }
    }
}

/// Structured token metadata as exposed by the broker and in renewal events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    pub expires_at: i64,
    pub token_type: String,
}
