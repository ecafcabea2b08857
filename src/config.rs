//! INI-style configuration file.
//!
//! ```text
//! # comment
//! [Signaling]
//! page_origin = "https://meet.example.com"
//! [ICE]
//! stun_servers = stun:stun.l.google.com:19302, stun:stun1.l.google.com:19302
//! ```
//!
//! Keys before the first `[Section]` are globals and act as a fallback for
//! the `*_or_default` lookups.
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::str::FromStr;

#[derive(Debug)]
pub enum ConfigError {
    Read { path: String, source: std::io::Error },
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => write!(f, "error reading file {path}: {source}"),
            ConfigError::InvalidValue {
                section,
                key,
                value,
            } => write!(f, "invalid value for [{section}] {key}: {value:?}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Default)]
pub struct Config {
    pub globals: HashMap<String, String>,
    pub sections: HashMap<String, HashMap<String, String>>,
}

impl Config {
    /// Reads and parses a config file.
    ///
    /// # Errors
    /// Returns [`ConfigError::Read`] when the file cannot be read.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        Ok(Self::parse(&content))
    }

    /// Parses config text. Lines that are neither sections nor `key = value`
    /// pairs are ignored.
    pub fn parse(content: &str) -> Self {
        let mut cfg = Config::empty();
        let mut current_section: Option<String> = None;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                current_section = Some(name.trim().to_owned());
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().to_owned();
            let value = value.trim().trim_matches('"').to_owned();

            match &current_section {
                None => {
                    cfg.globals.insert(key, value);
                }
                Some(sec) => {
                    cfg.sections
                        .entry(sec.clone())
                        .or_default()
                        .insert(key, value);
                }
            }
        }
        cfg
    }

    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|sec| sec.get(key))
            .map(String::as_str)
    }

    #[must_use]
    pub fn get_non_empty(&self, section: &str, key: &str) -> Option<&str> {
        self.get(section, key).filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn get_global(&self, key: &str) -> Option<&str> {
        self.globals.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn get_non_empty_or_default<'a>(
        &'a self,
        section: &str,
        key: &str,
        default: &'a str,
    ) -> &'a str {
        self.get_non_empty(section, key)
            .or_else(|| self.get_global(key).filter(|s| !s.is_empty()))
            .unwrap_or(default)
    }

    /// Parses a non-empty value with `FromStr`. `Ok(None)` when the key is
    /// missing or blank.
    ///
    /// # Errors
    /// [`ConfigError::InvalidValue`] when the value does not parse.
    pub fn get_parsed<T: FromStr>(&self, section: &str, key: &str) -> Result<Option<T>, ConfigError> {
        let Some(raw) = self.get_non_empty(section, key) else {
            return Ok(None);
        };
        raw.parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                section: section.to_owned(),
                key: key.to_owned(),
                value: raw.to_owned(),
            })
    }

    /// Splits a comma separated value into trimmed, non-empty items.
    #[must_use]
    pub fn get_list(&self, section: &str, key: &str) -> Vec<String> {
        self.get(section, key)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    const SAMPLE: &str = r#"
# client config
room_prefix = team

[Signaling]
page_origin = "https://meet.example.com"
base_url =

[ICE]
stun_servers = stun:a.example:3478 ,, stun:b.example:3478

[Session]
disconnect_grace_ms = 2500
offer_stagger_max_ms = soon
"#;

    #[test]
    fn parses_sections_globals_and_quotes() {
        let cfg = Config::parse(SAMPLE);
        assert_eq!(cfg.get_global("room_prefix"), Some("team"));
        assert_eq!(
            cfg.get("Signaling", "page_origin"),
            Some("https://meet.example.com")
        );
        assert_eq!(cfg.get("Signaling", "base_url"), Some(""));
        assert_eq!(cfg.get_non_empty("Signaling", "base_url"), None);
    }

    #[test]
    fn defaults_fall_back_to_globals_then_literal() {
        let cfg = Config::parse(SAMPLE);
        assert_eq!(cfg.get_non_empty_or_default("Media", "room_prefix", "x"), "team");
        assert_eq!(cfg.get_non_empty_or_default("Media", "width", "1280"), "1280");
    }

    #[test]
    fn list_values_skip_blanks() {
        let cfg = Config::parse(SAMPLE);
        assert_eq!(
            cfg.get_list("ICE", "stun_servers"),
            vec!["stun:a.example:3478", "stun:b.example:3478"]
        );
        assert!(cfg.get_list("ICE", "missing").is_empty());
    }

    #[test]
    fn parsed_values_report_bad_numbers() {
        let cfg = Config::parse(SAMPLE);
        let grace: Option<u64> = cfg.get_parsed("Session", "disconnect_grace_ms").unwrap();
        assert_eq!(grace, Some(2500));
        let missing: Option<u64> = cfg.get_parsed("Session", "nope").unwrap();
        assert_eq!(missing, None);
        let err = cfg
            .get_parsed::<u64>("Session", "offer_stagger_max_ms")
            .unwrap_err();
        assert!(err.to_string().contains("offer_stagger_max_ms"));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load("/definitely/not/here.conf").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
