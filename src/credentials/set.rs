use crate::acquisition::region::Region;
use crate::error::AcquireError;

/// Validated client credentials for the identity provider.
///
/// All four fields are required non-empty before the set can be used for a
/// direct exchange. The secret is redacted from `Debug` output so it never
/// lands in logs in plaintext.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSet {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
    pub region: Region,
}

impl CredentialSet {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        tenant_id: impl Into<String>,
        region: Region,
    ) -> Result<Self, AcquireError> {
        let set = Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            tenant_id: tenant_id.into(),
            region,
        };
        set.validate()?;
        Ok(set)
    }

    pub fn validate(&self) -> Result<(), AcquireError> {
        let mut missing = Vec::new();
        if self.client_id.trim().is_empty() {
            missing.push("client_id");
        }
        if self.client_secret.trim().is_empty() {
            missing.push("client_secret");
        }
        if self.tenant_id.trim().is_empty() {
            missing.push("tenant_id");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AcquireError::Configuration(format!(
                "missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}

impl std::fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSet")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .field("region", &self.region)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_empty_required_fields() {
        let err = CredentialSet::new("c1", " ", "t1", Region::NorthAmerica).unwrap_err();
        assert!(err.to_string().contains("client_secret"));

        let err = CredentialSet::new("", "", "t1", Region::Europe).unwrap_err();
        assert!(err.to_string().contains("client_id"));
        assert!(err.to_string().contains("client_secret"));
    }

    #[test]
    fn debug_redacts_the_secret() {
        let set = CredentialSet::new("c1", "super-secret", "t1", Region::NorthAmerica).unwrap();
        let rendered = format!("{:?}", set);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
