use std::fmt;

/// Identifies one reusable session slot.
///
/// Any `(integration, kind)` pair is a valid key; there is no registry of
/// known integrations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionKey {
    /// External data source, e.g. `"ths_web"`.
    pub integration: String,

    /// Session kind tag, e.g. `"Session"`.
    pub kind: String,
}

impl SessionKey {
    pub fn new(integration: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            integration: integration.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.integration, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(SessionKey::new("em_web", "Session").to_string(), "em_web/Session");
    }

    #[test]
    fn test_keys_differ_by_either_part() {
        let a = SessionKey::new("a", "x");
        assert_ne!(a, SessionKey::new("a", "y"));
        assert_ne!(a, SessionKey::new("b", "x"));
        assert_eq!(a, SessionKey::new("a", "x"));
    }
}
