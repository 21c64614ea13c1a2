use std::fmt;

/// Endpoint used when the configuration carries no override.
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Identifies one remote chat-completion service: a display label plus the
/// credential and endpoint needed to reach it.
///
/// Immutable after construction. Created once per provider and owned by the
/// client for its lifetime.
#[derive(Clone)]
pub struct ProviderConfig {
    label: String,
    description: Option<String>,
    credential: Option<String>,
    endpoint: Option<String>,
}

impl ProviderConfig {
    pub fn new(label: impl Into<String>) -> Self {
        ProviderConfig {
            label: label.into(),
            description: None,
            credential: None,
            endpoint: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn credential(&self) -> Option<&str> {
        self.credential.as_deref()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// The endpoint override, or the OpenAI default when none was given.
    pub fn endpoint_or_default(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("label", &self.label)
            .field("description", &self.description)
            .field(
                "credential",
                &self.credential.as_ref().map(|_| "[REDACTED]"),
            )
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
