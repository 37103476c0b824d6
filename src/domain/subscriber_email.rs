#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SubscriberEmail(String);

impl SubscriberEmail {
    /// Accepts any non-blank address as given. Format checks are left to the
    /// people reading the sheet.
    pub fn parse(email: String) -> Result<SubscriberEmail, String> {
        if email.trim().is_empty() {
            return Err(String::from("email is empty"));
        }

        Ok(Self(email))
    }

    /// Trims and lowercases `raw` before parsing it, the form the signup
    /// client submits and remembers.
    pub fn normalize(raw: &str) -> Result<SubscriberEmail, String> {
        Self::parse(raw.trim().to_lowercase())
    }
}

impl AsRef<str> for SubscriberEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriberEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
