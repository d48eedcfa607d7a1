use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::quiz::ai_helper::Persona;
use crate::quiz::Difficulty;

#[derive(Debug, Clone)]
pub struct Config {
    pub chatgpt_api_key: String,
    pub difficulty: Difficulty,
    pub questions_per_topic: usize,
    pub settle_delay: Duration,
    pub profile_dir: PathBuf,
    pub dialogue_db: String,
    pub request_timeout: Duration,
    pub persona: Persona,
}

impl Config {
    /// Reads the process environment. Call `dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let chatgpt_api_key = lookup("CHATGPT_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::Missing("CHATGPT_API_KEY"))?;

        let difficulty = match lookup("TRIVIA_DIFFICULTY") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "TRIVIA_DIFFICULTY",
                value,
            })?,
            None => Difficulty::default(),
        };

        let questions_per_topic = parse_number(&lookup, "TRIVIA_QUESTIONS_PER_TOPIC", 5)?;
        if !(1..=20).contains(&questions_per_topic) {
            return Err(ConfigError::Invalid {
                key: "TRIVIA_QUESTIONS_PER_TOPIC",
                value: questions_per_topic.to_string(),
            });
        }

        let persona = match lookup("TRIVIA_PERSONA") {
            Some(value) => Persona::from_name(&value).ok_or(ConfigError::Invalid {
                key: "TRIVIA_PERSONA",
                value,
            })?,
            None => Persona::default(),
        };

        Ok(Self {
            chatgpt_api_key,
            difficulty,
            questions_per_topic: questions_per_topic as usize,
            settle_delay: Duration::from_millis(parse_number(&lookup, "TRIVIA_SETTLE_DELAY_MS", 1200)?),
            profile_dir: lookup("TRIVIA_PROFILE_DIR")
                .unwrap_or_else(|| "profiles".to_string())
                .into(),
            dialogue_db: lookup("TRIVIA_DIALOGUE_DB").unwrap_or_else(|| "db.sqlite".to_string()),
            request_timeout: Duration::from_secs(parse_number(
                &lookup,
                "TRIVIA_REQUEST_TIMEOUT_SECS",
                60,
            )?),
            persona,
        })
    }
}

fn parse_number(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_the_key_is_set() {
        let config = Config::from_lookup(lookup(&[("CHATGPT_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.difficulty, Difficulty::Medium);
        assert_eq!(config.questions_per_topic, 5);
        assert_eq!(config.settle_delay, Duration::from_millis(1200));
        assert_eq!(config.profile_dir, PathBuf::from("profiles"));
        assert_eq!(config.persona, Persona::Professor);
    }

    #[test]
    fn missing_key_is_an_error() {
        assert!(matches!(
            Config::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("CHATGPT_API_KEY"))
        ));
    }

    #[test]
    fn bad_values_are_not_defaulted() {
        for (key, value) in [
            ("TRIVIA_DIFFICULTY", "nightmare"),
            ("TRIVIA_QUESTIONS_PER_TOPIC", "0"),
            ("TRIVIA_SETTLE_DELAY_MS", "soon"),
            ("TRIVIA_PERSONA", "robot"),
        ] {
            let result = Config::from_lookup(lookup(&[("CHATGPT_API_KEY", "sk"), (key, value)]));
            assert!(
                matches!(result, Err(ConfigError::Invalid { key: k, .. }) if k == key),
                "{key}={value}"
            );
        }
    }
}
