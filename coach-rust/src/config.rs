use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Languages offered for solutions and code translation.
pub const LANGUAGES: [&str; 5] = ["Python", "JavaScript", "Java", "C++", "Go"];

pub const DEFAULT_LANGUAGE: &str = "Python";

/// Storage key of the API key.
pub const API_KEY_KEY: &str = "apiKey";
/// Storage key of the theme preference.
pub const THEME_KEY: &str = "theme";

/// Sample problems a client can offer on an empty conversation, as
/// `(name, statement)`.
pub const EXAMPLE_PROBLEMS: [(&str, &str); 3] = [
    (
        "Two Sum",
        "Given an array of integers nums and an integer target, return indices of the two numbers such that they add up to target.",
    ),
    (
        "Reverse Linked List",
        "Given the head of a singly linked list, reverse the list, and return the reversed list.",
    ),
    (
        "Valid Parentheses",
        "Given a string s containing just the characters '(', ')', '{', '}', '[' and ']', determine if the input string is valid.",
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    #[must_use]
    pub fn from_prefers_dark(prefers_dark: bool) -> Self {
        if prefers_dark {
            Self::Dark
        } else {
            Self::Light
        }
    }

    /// Guess the system preference from the terminal's `COLORFGBG`
    /// (`"<fg>;<bg>"`). Dark backgrounds use the low ANSI colors other than
    /// 7.
    #[must_use]
    pub fn detect() -> Self {
        std::env::var("COLORFGBG")
            .ok()
            .and_then(|value| Self::from_colorfgbg(&value))
            .unwrap_or_default()
    }

    fn from_colorfgbg(value: &str) -> Option<Self> {
        let background: u8 = value.rsplit(';').next()?.trim().parse().ok()?;
        Some(Self::from_prefers_dark(matches!(background, 0..=6 | 8)))
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}

/// Settings of the running application. Only `api_key` and `theme` are
/// persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_key: Option<String>,
    pub theme: Theme,
    pub preferred_language: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            theme: Theme::default(),
            preferred_language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_parses_stored_values() {
        assert_eq!("dark".parse::<Theme>(), Ok(Theme::Dark));
        assert_eq!("light".parse::<Theme>(), Ok(Theme::Light));
        assert!("sepia".parse::<Theme>().is_err());
    }

    #[test]
    fn colorfgbg_background_decides_theme() {
        assert_eq!(Theme::from_colorfgbg("15;0"), Some(Theme::Dark));
        assert_eq!(Theme::from_colorfgbg("0;15"), Some(Theme::Light));
        assert_eq!(Theme::from_colorfgbg("12;default;8"), Some(Theme::Dark));
        assert_eq!(Theme::from_colorfgbg("garbage"), None);
    }

    #[test]
    fn default_language_is_supported() {
        assert!(LANGUAGES.contains(&DEFAULT_LANGUAGE));
        assert_eq!(AppConfig::default().preferred_language, "Python");
    }
}
