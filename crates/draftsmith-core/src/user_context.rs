//! User context attached to every workflow request.
//!
//! Set at login, persisted by the infrastructure layer, and sent read-only
//! with each structuring payload so the agent can personalize its behavior.

use serde::{Deserialize, Serialize};

/// Identity and organizational context of the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    /// Employee/user identifier.
    pub user_id: String,
    /// Organizational department.
    pub department: String,
    /// Role or title.
    pub role: String,
    /// Office or location.
    pub location: String,
    /// Preferred language code.
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "en".to_string()
}

impl UserContext {
    pub fn new(
        user_id: impl Into<String>,
        department: impl Into<String>,
        role: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            department: department.into(),
            role: role.into(),
            location: location.into(),
            language: default_language(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_defaults_to_english_on_deserialize() {
        let json = r#"{"user_id":"u1","department":"Legal","role":"Counsel","location":"Berlin"}"#;
        let context: UserContext = serde_json::from_str(json).unwrap();
        assert_eq!(context.language, "en");
    }
}
