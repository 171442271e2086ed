use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SessionIdError;

/// Opaque identifier of one recorded session, end-to-end from raw artifact
/// to ingestion acknowledgement.
///
/// Ids double as local file names, so anything that could escape the
/// working directory is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    pub fn parse(raw: impl Into<String>) -> Result<Self, SessionIdError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(SessionIdError::Empty);
        }
        if raw.contains(['/', '\\'])
            || raw.contains("..")
            || raw.chars().any(char::is_control)
        {
            return Err(SessionIdError::Forbidden(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = SessionIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl AsRef<str> for SessionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_ids() {
        let id = SessionId::parse("76561198-abc_01").unwrap();
        assert_eq!(id.as_str(), "76561198-abc_01");
        assert_eq!(id.to_string(), "76561198-abc_01");
    }

    #[test]
    fn rejects_empty_and_path_like_ids() {
        assert_eq!(SessionId::parse(""), Err(SessionIdError::Empty));
        assert!(SessionId::parse("../etc/passwd").is_err());
        assert!(SessionId::parse("a/b").is_err());
        assert!(SessionId::parse("a\\b").is_err());
        assert!(SessionId::parse("line\nbreak").is_err());
    }

    #[test]
    fn deserializes_through_validation() {
        let ids: Vec<SessionId> = serde_json::from_str(r#"["s1","s2"]"#).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(serde_json::from_str::<Vec<SessionId>>(r#"["ok",".."]"#).is_err());
    }
}
