use serde::Deserialize;

/// Provider region, selecting the auth domain used for direct exchange.
///
/// Unrecognized codes deserialize to the default region rather than failing,
/// so a misspelled region degrades to the primary auth domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Region {
    NorthAmerica,
    Europe,
    AsiaPacific,
    Australia,
}

impl Region {
    pub const DEFAULT: Region = Region::NorthAmerica;

    /// Region-specific auth domain used to build the token endpoint URL.
    pub fn auth_domain(&self) -> &'static str {
        match self {
            Region::NorthAmerica => "https://auth.na.identityprovider.com",
            Region::Europe => "https://auth.eu.identityprovider.com",
            Region::AsiaPacific => "https://auth.apac.identityprovider.com",
            Region::Australia => "https://auth.au.identityprovider.com",
        }
    }

    pub fn parse(code: &str) -> Region {
        match code.trim().to_ascii_lowercase().as_str() {
            "northamerica" | "na" | "us" => Region::NorthAmerica,
            "europe" | "eu" => Region::Europe,
            "asiapacific" | "apac" => Region::AsiaPacific,
            "australia" | "au" => Region::Australia,
            other => {
                tracing::warn!(
                    "unrecognized region code '{}', using default region",
                    other
                );
                Region::DEFAULT
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::NorthAmerica => "NorthAmerica",
            Region::Europe => "Europe",
            Region::AsiaPacific => "AsiaPacific",
            Region::Australia => "Australia",
        }
    }
}

impl From<String> for Region {
    fn from(code: String) -> Self {
        Region::parse(&code)
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
