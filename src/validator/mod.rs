use crate::error::ValidationError;
use crate::helpers::time::now_i64;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::Deserialize;

/// Claims extracted from the payload segment of a bearer token.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Claims {
    pub exp: Option<i64>,
    pub iat: Option<i64>,
    pub iss: Option<String>,
    pub aud: Option<Audience>,
    pub sub: Option<String>,
}

/// The `aud` claim may be a single value or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    One(String),
    Many(Vec<String>),
}

impl Audience {
    /// Non-empty intersection with the expected audience counts as a match.
    pub fn contains(&self, expected: &str) -> bool {
        match self {
            Audience::One(aud) => aud == expected,
            Audience::Many(auds) => auds.iter().any(|aud| aud == expected),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidatorConfig {
    /// Expected `iss` claim. Unset skips the issuer check.
    pub expected_issuer: Option<String>,
    /// Expected `aud` claim. Unset skips the audience check.
    pub expected_audience: Option<String>,
    /// Allowance for clock skew past nominal expiry.
    pub clock_tolerance_seconds: i64,
}

/// Stateless decode/check for bearer tokens shaped as three dot-separated
/// segments. Malformed input always degrades to `None`/invalid; nothing in
/// here panics on bad data.
#[derive(Debug, Clone, Default)]
pub struct TokenValidator {
    config: ValidatorConfig,
}

impl TokenValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Decodes the payload segment. Wrong segment count, bad base64 or bad
    /// JSON all yield `None`.
    pub fn decode_claims(&self, token: &str) -> Option<Claims> {
        let mut segments = token.split('.');
        let (_header, payload, _signature) =
            (segments.next()?, segments.next()?, segments.next()?);
        if segments.next().is_some() {
            return None;
        }
        let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// True when the token is undecodable, carries no expiry, or expires
    /// within `buffer_seconds` from now. A negative buffer expresses
    /// tolerance past nominal expiry.
    pub fn is_expired(&self, token: &str, buffer_seconds: i64) -> bool {
        match self.decode_claims(token).and_then(|claims| claims.exp) {
            Some(exp) => exp - buffer_seconds <= now_i64(),
            None => true,
        }
    }

    /// True only for tokens that are still valid but enter the renewal window
    /// within `threshold_seconds`.
    pub fn is_expiring_soon(&self, token: &str, threshold_seconds: i64) -> bool {
        let Some(exp) = self.decode_claims(token).and_then(|claims| claims.exp) else {
            return false;
        };
        if self.is_expired(token, 0) {
            return false;
        }
        exp - now_i64() <= threshold_seconds
    }

    /// Full check chain: decodability, non-expiry honoring the configured
    /// clock tolerance, then issuer and audience when configured.
    pub fn validate(&self, token: &str) -> Result<Claims, ValidationError> {
        let claims = self
            .decode_claims(token)
            .ok_or(ValidationError::Malformed)?;

        if self.is_expired(token, -self.config.clock_tolerance_seconds) {
            return Err(ValidationError::Expired);
        }

        if let Some(expected) = &self.config.expected_issuer {
            match &claims.iss {
                Some(iss) if iss == expected => {}
                other => {
                    return Err(ValidationError::IssuerMismatch {
                        expected: expected.clone(),
                        found: other.clone().unwrap_or_default(),
                    })
                }
            }
        }

        if let Some(expected) = &self.config.expected_audience {
            let matched = claims
                .aud
                .as_ref()
                .map(|aud| aud.contains(expected))
                .unwrap_or(false);
            if !matched {
                return Err(ValidationError::AudienceMismatch {
                    expected: expected.clone(),
                });
            }
        }

        Ok(claims)
    }
}
