//! The host's navigable history, seen from the game.
//!
//! Markers are opaque: the controller only counts on being told that *a* pop
//! happened. Whatever was stored inside the popped entry may or may not have
//! survived, so nothing reads it back except the one-time initialization check.

use serde::{Deserialize, Serialize};

use crate::stage::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarkerKey {
    Root,
    AppInitialized,
    Step2,
    Subtopic,
    QuizStart,
    Results,
    Locked,
}

impl MarkerKey {
    pub fn as_str(self) -> &'static str {
        match self {
            MarkerKey::Root => "root",
            MarkerKey::AppInitialized => "app_initialized",
            MarkerKey::Step2 => "step_2",
            MarkerKey::Subtopic => "subtopic",
            MarkerKey::QuizStart => "quiz_start",
            MarkerKey::Results => "results",
            MarkerKey::Locked => "locked",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub key: MarkerKey,
    pub stage: Option<Stage>,
}

impl Marker {
    pub fn new(key: MarkerKey) -> Self {
        Self { key, stage: None }
    }

    pub fn for_stage(key: MarkerKey, stage: Stage) -> Self {
        Self {
            key,
            stage: Some(stage),
        }
    }
}

/// What happened after asking the host to go back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostNav {
    /// Moved within the app's own entries; a pop notification follows.
    Popped,
    /// Moved past the app's first entry, the app is gone.
    Left,
    /// The request was out of range and the host did nothing.
    Ignored,
}

pub trait HostHistory {
    fn push_marker(&mut self, marker: Marker);

    fn replace_current_marker(&mut self, marker: Marker);

    fn go_back(&mut self, steps: usize) -> HostNav;

    /// Attempts to close the whole host surface. Returns `false` when refused.
    fn close(&mut self) -> bool;

    /// The marker at the current position, if the host kept it.
    fn current_marker(&self) -> Option<Marker>;

    /// Drains pop notifications delivered since the last call.
    fn take_popped(&mut self) -> usize;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub marker: Option<Marker>,
    /// Entries that belong to whatever was open before the app.
    pub foreign: bool,
}

/// A browser-like history stack kept in memory.
///
/// Going back further than the first entry is ignored, the same way
/// `history.go(-n)` is ignored when out of range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryHistory {
    entries: Vec<HistoryEntry>,
    cursor: usize,
    popped: usize,
    pushes: usize,
    closable: bool,
    left: bool,
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::with_foreign_entries(0)
    }
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// A history where `count` foreign pages were visited before the app was opened.
    pub fn with_foreign_entries(count: usize) -> Self {
        let mut entries = vec![
            HistoryEntry {
                marker: None,
                foreign: true,
            };
            count
        ];
        entries.push(HistoryEntry {
            marker: None,
            foreign: false,
        });
        Self {
            cursor: count,
            entries,
            popped: 0,
            pushes: 0,
            closable: false,
            left: false,
        }
    }

    pub fn closable(mut self) -> Self {
        self.closable = true;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of markers pushed since creation.
    pub fn pushes(&self) -> usize {
        self.pushes
    }

    pub fn has_left(&self) -> bool {
        self.left
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }
}

impl HostHistory for MemoryHistory {
    fn push_marker(&mut self, marker: Marker) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(HistoryEntry {
            marker: Some(marker),
            foreign: false,
        });
        self.cursor += 1;
        self.pushes += 1;
    }

    fn replace_current_marker(&mut self, marker: Marker) {
        if let Some(entry) = self.entries.get_mut(self.cursor) {
            entry.marker = Some(marker);
        }
    }

    fn go_back(&mut self, steps: usize) -> HostNav {
        if steps == 0 || steps > self.cursor || self.left {
            return HostNav::Ignored;
        }
        self.cursor -= steps;
        if self.entries[self.cursor].foreign {
            self.left = true;
            HostNav::Left
        } else {
            // One notification per traversal, however many entries it skipped.
            self.popped += 1;
            HostNav::Popped
        }
    }

    fn close(&mut self) -> bool {
        if self.closable {
            self.left = true;
        }
        self.closable
    }

    fn current_marker(&self) -> Option<Marker> {
        self.entries.get(self.cursor).and_then(|entry| entry.marker)
    }

    fn take_popped(&mut self) -> usize {
        std::mem::take(&mut self.popped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_truncates_forward_entries() {
        let mut history = MemoryHistory::new();
        history.push_marker(Marker::new(MarkerKey::Step2));
        history.push_marker(Marker::new(MarkerKey::Subtopic));
        assert_eq!(history.go_back(1), HostNav::Popped);
        history.push_marker(Marker::new(MarkerKey::QuizStart));

        assert_eq!(history.len(), 3);
        assert_eq!(
            history.current_marker().map(|m| m.key),
            Some(MarkerKey::QuizStart)
        );
        assert_eq!(history.take_popped(), 1);
        assert_eq!(history.take_popped(), 0);
    }

    #[test]
    fn going_past_the_first_app_entry_leaves() {
        let mut history = MemoryHistory::with_foreign_entries(1);
        history.push_marker(Marker::new(MarkerKey::AppInitialized));

        assert_eq!(history.go_back(2), HostNav::Left);
        assert!(history.has_left());
        assert_eq!(history.take_popped(), 0);
    }

    #[test]
    fn out_of_range_back_is_ignored() {
        let mut history = MemoryHistory::new();
        history.push_marker(Marker::new(MarkerKey::AppInitialized));

        assert_eq!(history.go_back(5), HostNav::Ignored);
        assert_eq!(history.cursor(), 1);
        assert!(!history.has_left());
    }

    #[test]
    fn close_respects_host_policy() {
        assert!(!MemoryHistory::new().close());

        let mut closable = MemoryHistory::new().closable();
        assert!(closable.close());
        assert!(closable.has_left());
    }
}
