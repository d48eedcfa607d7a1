use log::debug;
use serde::{Deserialize, Serialize};

use crate::quiz::Topic;

pub const MAX_SUBTOPICS: usize = 4;

pub struct Category {
    pub id: &'static str,
    pub label: &'static str,
    pub subtopics: &'static [(&'static str, &'static str)],
}

pub static CATALOG: &[Category] = &[
    Category {
        id: "history",
        label: "History",
        subtopics: &[
            ("history-ancient", "Ancient World"),
            ("history-medieval", "Middle Ages"),
            ("history-modern", "Modern History"),
            ("history-wars", "World Wars"),
            ("history-empires", "Empires"),
            ("history-revolutions", "Revolutions"),
        ],
    },
    Category {
        id: "science",
        label: "Science",
        subtopics: &[
            ("science-physics", "Physics"),
            ("science-chemistry", "Chemistry"),
            ("science-biology", "Biology"),
            ("science-space", "Space"),
            ("science-math", "Mathematics"),
        ],
    },
    Category {
        id: "geography",
        label: "Geography",
        subtopics: &[
            ("geo-capitals", "Capitals"),
            ("geo-flags", "Flags"),
            ("geo-rivers", "Rivers & Mountains"),
            ("geo-europe", "Europe"),
            ("geo-asia", "Asia"),
        ],
    },
    Category {
        id: "culture",
        label: "Arts & Culture",
        subtopics: &[
            ("culture-literature", "Literature"),
            ("culture-painting", "Painting"),
            ("culture-music", "Music"),
            ("culture-film", "Film"),
            ("culture-mythology", "Mythology"),
        ],
    },
    Category {
        id: "sports",
        label: "Sports",
        subtopics: &[
            ("sports-football", "Football"),
            ("sports-olympics", "Olympics"),
            ("sports-tennis", "Tennis"),
            ("sports-chess", "Chess"),
        ],
    },
    Category {
        id: "technology",
        label: "Technology",
        subtopics: &[
            ("tech-computing", "Computing"),
            ("tech-internet", "Internet"),
            ("tech-inventions", "Inventions"),
            ("tech-games", "Video Games"),
        ],
    },
];

pub fn category(id: &str) -> Option<&'static Category> {
    CATALOG.iter().find(|c| c.id == id)
}

pub fn category_by_label(label: &str) -> Option<&'static Category> {
    CATALOG.iter().find(|c| c.label == label)
}

impl Category {
    pub fn topics(&self) -> impl Iterator<Item = Topic> + '_ {
        self.subtopics.iter().map(|(id, label)| Topic::new(*id, *label))
    }

    pub fn topic_by_label(&self, label: &str) -> Option<Topic> {
        self.topics().find(|t| t.label == label)
    }
}

/// Category and subtopic choice made on the TopicSelection stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicPicker {
    category: Option<String>,
    selected: Vec<Topic>,
}

impl TopicPicker {
    pub fn category(&self) -> Option<&'static Category> {
        self.category.as_deref().and_then(category)
    }

    pub fn selected(&self) -> &[Topic] {
        &self.selected
    }

    pub fn is_selected(&self, topic: &Topic) -> bool {
        self.selected.contains(topic)
    }

    pub fn open_category(&mut self, id: &str) -> bool {
        if category(id).is_none() {
            return false;
        }
        self.category = Some(id.to_string());
        self.selected.clear();
        true
    }

    /// Adds or removes `topic`. Adding past [`MAX_SUBTOPICS`] is refused.
    pub fn toggle(&mut self, topic: Topic) -> bool {
        if let Some(pos) = self.selected.iter().position(|t| *t == topic) {
            self.selected.remove(pos);
            return true;
        }
        if self.selected.len() >= MAX_SUBTOPICS {
            debug!("subtopic cap reached, ignoring {}", topic.label);
            return false;
        }
        self.selected.push(topic);
        true
    }

    pub fn clear_subtopics(&mut self) {
        self.selected.clear();
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
