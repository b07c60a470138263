use crate::{
    config::{AppConfig, Theme, API_KEY_KEY, THEME_KEY},
    conversation::Conversation,
    errors::{CoachError, CoachResult, Precondition},
    service::{AiService, AiServiceOptions},
    storage::CredentialStore,
};
use serde_json::Value;
use std::{collections::HashMap, sync::Arc};

pub const SAVED_KEY_INVALID: &str = "Your saved API key is invalid. Please enter it again.";
pub const SUBMITTED_KEY_INVALID: &str =
    "Failed to initialize with the provided key. It might be invalid.";

#[derive(Debug, Clone, Default)]
pub struct CoachAppOptions {
    pub service: AiServiceOptions,
    /// System dark-mode preference, used when no theme is stored. Detected
    /// from the terminal when unset.
    pub prefers_dark: Option<bool>,
}

/// Owns the settings and the API-key lifecycle. The conversation is only
/// available once a key has been accepted.
pub struct CoachApp {
    store: Arc<dyn CredentialStore>,
    options: CoachAppOptions,
    config: AppConfig,
    api_key_error: Option<String>,
    conversation: Option<Conversation>,
}

impl CoachApp {
    /// Loads the stored key and theme. A stored key is used to set up the
    /// AI service right away. Storage failures are logged and treated as an
    /// empty store.
    pub async fn start(store: Arc<dyn CredentialStore>, options: CoachAppOptions) -> Self {
        let stored = match store.get(&[API_KEY_KEY, THEME_KEY]).await {
            Ok(stored) => stored,
            Err(error) => {
                tracing::warn!(error = %error, "failed to read stored settings");
                HashMap::new()
            }
        };

        let theme = stored
            .get(THEME_KEY)
            .and_then(Value::as_str)
            .and_then(|theme| theme.parse().ok())
            .unwrap_or_else(|| {
                options
                    .prefers_dark
                    .map_or_else(Theme::detect, Theme::from_prefers_dark)
            });

        let mut app = Self {
            store,
            options,
            config: AppConfig {
                theme,
                ..AppConfig::default()
            },
            api_key_error: None,
            conversation: None,
        };

        match stored.get(API_KEY_KEY) {
            None | Some(Value::Null) => {}
            Some(Value::String(key)) if key.is_empty() => {}
            Some(value) => {
                let result = match value.as_str() {
                    Some(key) => AiService::initialize(key, app.options.service.clone())
                        .map(|service| (key, service)),
                    None => Err(CoachError::Initialization(
                        "stored API key is not a string".to_string(),
                    )),
                };
                match result {
                    Ok((key, service)) => app.install(key, service),
                    Err(error) => {
                        tracing::error!(error = %error, "failed to initialize with stored API key");
                        app.api_key_error = Some(SAVED_KEY_INVALID.to_string());
                    }
                }
            }
        }

        app
    }

    /// Sets up the AI service with `key` and persists it. The key only
    /// replaces the current one once both steps succeed.
    pub async fn submit_api_key(&mut self, key: &str) -> CoachResult<()> {
        self.api_key_error = None;

        let result = async {
            let service = AiService::initialize(key, self.options.service.clone())?;
            self.store
                .set(HashMap::from([(
                    API_KEY_KEY.to_string(),
                    Value::String(key.to_string()),
                )]))
                .await?;
            Ok(service)
        }
        .await;

        match result {
            Ok(service) => {
                self.install(key, service);
                Ok(())
            }
            Err(error) => {
                tracing::error!(error = %error, "failed to initialize with submitted API key");
                self.api_key_error = Some(SUBMITTED_KEY_INVALID.to_string());
                Err(error)
            }
        }
    }

    /// Applies and persists the theme. The new theme stays applied even if
    /// it could not be saved.
    pub async fn set_theme(&mut self, theme: Theme) -> CoachResult<()> {
        self.config.theme = theme;
        self.store
            .set(HashMap::from([(
                THEME_KEY.to_string(),
                Value::String(theme.as_str().to_string()),
            )]))
            .await
    }

    pub async fn set_language(&mut self, language: &str) {
        self.config.preferred_language = language.to_string();
        if let Some(conversation) = &self.conversation {
            conversation.set_preferred_language(language).await;
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.config.theme
    }

    #[must_use]
    pub fn api_key_error(&self) -> Option<&str> {
        self.api_key_error.as_deref()
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.conversation.is_some()
    }

    pub fn conversation(&self) -> CoachResult<&Conversation> {
        self.conversation
            .as_ref()
            .ok_or_else(|| Precondition::NotConfigured.into())
    }

    fn install(&mut self, key: &str, service: AiService) {
        self.config.api_key = Some(key.to_string());
        self.conversation = Some(Conversation::with_language(
            service,
            self.config.preferred_language.clone(),
        ));
    }
}
