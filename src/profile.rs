//! The player's durable profile and the stores that keep it.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::i18n::Language;
use crate::quiz::Difficulty;

pub const STORAGE_KEY: &str = "trivia_profile_v1";
pub const PROFILE_VERSION: u32 = 1;
pub const DEFAULT_RATING: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Female, Gender::Male, Gender::Other];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    Under18,
    From18To24,
    From25To34,
    From35To44,
    From45To54,
    Over55,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 6] = [
        AgeGroup::Under18,
        AgeGroup::From18To24,
        AgeGroup::From25To34,
        AgeGroup::From35To44,
        AgeGroup::From45To54,
        AgeGroup::Over55,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AgeGroup::Under18 => "<18",
            AgeGroup::From18To24 => "18-24",
            AgeGroup::From25To34 => "25-34",
            AgeGroup::From35To44 => "35-44",
            AgeGroup::From45To54 => "45-54",
            AgeGroup::Over55 => "55+",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub timestamp: DateTime<Utc>,
    pub topic_id: String,
    pub score: u8,
    pub ai_score: u8,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub gender: Option<Gender>,
    pub age_group: Option<AgeGroup>,
    pub nationality: Option<String>,
    pub language: Option<Language>,
    /// Topic label -> best score (0-100).
    pub best_scores: BTreeMap<String, u8>,
    /// Topic id -> rating.
    pub ratings: BTreeMap<String, u32>,
    /// Question ids in the order they were first answered.
    pub seen_questions: Vec<String>,
    pub history: Vec<SessionRecord>,
}

impl UserProfile {
    pub fn rating(&self, topic_id: &str) -> u32 {
        self.ratings.get(topic_id).copied().unwrap_or(DEFAULT_RATING)
    }

    pub fn has_seen(&self, question_id: &str) -> bool {
        self.seen_questions.iter().any(|id| id == question_id)
    }

    /// Appends an id unless it was seen before; the oldest id stays first.
    pub fn mark_seen(&mut self, question_id: &str) {
        if !self.has_seen(question_id) {
            self.seen_questions.push(question_id.to_string());
        }
    }

    pub fn is_complete(&self) -> bool {
        self.gender.is_some() && self.age_group.is_some() && self.nationality.is_some()
    }

    /// Short demographic line handed to the content provider.
    pub fn demographic_summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(age) = self.age_group {
            parts.push(format!("age {}", age.label()));
        }
        if let Some(gender) = self.gender {
            parts.push(format!("gender {gender:?}").to_lowercase());
        }
        if let Some(nationality) = &self.nationality {
            parts.push(format!("from {nationality}"));
        }
        if parts.is_empty() {
            "anonymous player".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// The persisted blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredProfile {
    pub version: u32,
    pub profile: UserProfile,
}

pub trait ProfileStore {
    fn load(&self, key: &str) -> Result<Option<UserProfile>, StoreError>;

    fn save(&self, key: &str, profile: &UserProfile) -> Result<(), StoreError>;
}

fn decode(bytes: &[u8]) -> Result<UserProfile, StoreError> {
    let stored: StoredProfile = serde_json::from_slice(bytes)?;
    if stored.version != PROFILE_VERSION {
        return Err(StoreError::UnsupportedVersion(stored.version));
    }
    Ok(stored.profile)
}

fn encode(profile: &UserProfile) -> Result<Vec<u8>, StoreError> {
    let stored = StoredProfile {
        version: PROFILE_VERSION,
        profile: profile.clone(),
    };
    Ok(serde_json::to_vec_pretty(&stored)?)
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

impl ProfileStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<UserProfile>, StoreError> {
        match fs::read(self.path(key)) {
            Ok(bytes) => decode(&bytes).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, profile: &UserProfile) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, encode(profile)?)?;
        fs::rename(&tmp, &path)?;
        debug!("profile saved to {}", path.display());
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<UserProfile>, StoreError> {
        let blobs = self.blobs.lock().map_err(|_| StoreError::LockPoisoned)?;
        blobs.get(key).map(|bytes| decode(bytes)).transpose()
    }

    fn save(&self, key: &str, profile: &UserProfile) -> Result<(), StoreError> {
        let bytes = encode(profile)?;
        self.blobs
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?
            .insert(key.to_string(), bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("trivia_trail_{}_{}", std::process::id(), name));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn sample() -> UserProfile {
        let mut profile = UserProfile {
            nationality: Some("Ukraine".into()),
            ..UserProfile::default()
        };
        profile.best_scores.insert("History".into(), 80);
        profile.mark_seen("h1");
        profile
    }

    #[test]
    fn seen_ids_keep_first_answer_order() {
        let mut profile = UserProfile::default();
        for id in ["z9", "a1", "z9", "m5"] {
            profile.mark_seen(id);
        }
        assert_eq!(profile.seen_questions, ["z9", "a1", "m5"]);
        assert!(profile.has_seen("a1"));
        assert!(!profile.has_seen("b2"));
    }

    #[test]
    fn file_store_round_trips_and_misses_cleanly() {
        let store = JsonFileStore::new(temp_dir("round_trip"));
        assert_eq!(store.load(STORAGE_KEY).unwrap(), None);

        store.save(STORAGE_KEY, &sample()).unwrap();
        assert_eq!(store.load(STORAGE_KEY).unwrap(), Some(sample()));
    }

    #[test]
    fn unknown_version_is_rejected() {
        let dir = temp_dir("version");
        let store = JsonFileStore::new(&dir);
        store.save("p", &sample()).unwrap();
        let path = dir.join("p.json");
        let text = fs::read_to_string(&path).unwrap().replace("\"version\": 1", "\"version\": 7");
        fs::write(&path, text).unwrap();

        assert!(matches!(store.load("p"), Err(StoreError::UnsupportedVersion(7))));
    }

    #[test]
    fn keys_are_sanitized_into_file_names() {
        let store = JsonFileStore::new("/tmp/x");
        assert_eq!(store.path("a/../b:1"), PathBuf::from("/tmp/x/a____b_1.json"));
    }

    #[test]
    fn summary_mentions_only_known_fields() {
        assert_eq!(UserProfile::default().demographic_summary(), "anonymous player");
        let profile = UserProfile {
            age_group: Some(AgeGroup::From25To34),
            ..sample()
        };
        assert_eq!(profile.demographic_summary(), "age 25-34, from Ukraine");
        assert_eq!(profile.rating("history"), DEFAULT_RATING);
    }
}
