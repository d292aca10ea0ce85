use std::fmt;

/// Length of a well-formed API key.
pub const CREDENTIAL_LEN: usize = 40;

/// Key the API accepts at a very low rate; only used on explicit opt-in.
pub const DEMO_CREDENTIAL: &str = "DEMO_KEY";

/// Opaque API access token. `Debug`/`Display` never print the full value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential(String);

impl Credential {
    /// Accepts the trimmed candidate if it has the expected length.
    pub fn parse(candidate: &str) -> Option<Self> {
        let trimmed = candidate.trim();
        if trimmed.chars().count() == CREDENTIAL_LEN {
            Some(Self(trimmed.to_string()))
        } else {
            None
        }
    }

    pub fn demo() -> Self {
        Self(DEMO_CREDENTIAL.to_string())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn masked(&self) -> String {
        mask(&self.0)
    }
}

pub fn mask(raw: &str) -> String {
    let head: String = raw.chars().take(4).collect();
    format!("{head}***")
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.masked())
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}
