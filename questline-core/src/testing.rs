//! Test doubles and fixtures.
//!
//! Provides:
//! - [`MemoryRepository`]: an in-memory content repository built with
//!   `with_*` calls
//! - [`RecordingPlayer`]: a media player that records every call
//! - [`demo_repository`]: a small complete quest fixture
//! - [`QuestHarness`]: a session wired to all of the above, with
//!   assertion helpers
//!
//! Everything here is also usable from integration tests and the
//! headless runner, so it lives in a regular module rather than behind
//! `cfg(test)`.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::content::{ClipHandle, ContentEntry, ContentError, ContentRepository};
use crate::media::MediaPlayer;
use crate::reveal::TextReveal;
use crate::session::{Cursor, QuestSession, QuestState, SessionConfig, Stage};
use crate::story::BranchIndex;
use crate::surface::TextBuffer;

// ============================================================================
// MemoryRepository
// ============================================================================

/// An in-memory [`ContentRepository`].
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    texts: HashMap<String, String>,
    media: HashSet<String>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a text record.
    pub fn with_text(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.texts.insert(key.into(), text.into());
        self
    }

    /// Mark a media key as present.
    pub fn with_media(mut self, key: impl Into<String>) -> Self {
        self.media.insert(key.into());
        self
    }
}

impl ContentRepository for MemoryRepository {
    fn get_text(&self, key: &str) -> Result<String, ContentError> {
        self.texts
            .get(key)
            .cloned()
            .ok_or_else(|| ContentError::NotFound(key.to_string()))
    }

    fn list(&self, key_prefix: &str) -> Result<Vec<ContentEntry>, ContentError> {
        let prefix = format!("{key_prefix}/");
        let mut entries: Vec<ContentEntry> = self
            .texts
            .iter()
            .filter_map(|(key, text)| {
                key.strip_prefix(&prefix).map(|name| ContentEntry {
                    name: name.to_string(),
                    text: text.clone(),
                })
            })
            .filter(|entry| !entry.name.contains('/'))
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn get_media(&self, key: &str) -> Option<ClipHandle> {
        self.media.contains(key).then(|| ClipHandle::new(key))
    }
}

// ============================================================================
// RecordingPlayer
// ============================================================================

/// One call made to a [`RecordingPlayer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    Assigned(ClipHandle),
    Played,
}

/// A [`MediaPlayer`] that records its calls.
///
/// Clones share the event log, so a test keeps one half and boxes the
/// other into the stage.
#[derive(Debug, Clone, Default)]
pub struct RecordingPlayer {
    events: Rc<RefCell<Vec<MediaEvent>>>,
}

impl RecordingPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MediaEvent> {
        self.events.borrow().clone()
    }

    /// Clips assigned so far, in order.
    pub fn assigned_clips(&self) -> Vec<ClipHandle> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                MediaEvent::Assigned(clip) => Some(clip.clone()),
                MediaEvent::Played => None,
            })
            .collect()
    }

    pub fn play_count(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|event| **event == MediaEvent::Played)
            .count()
    }
}

impl MediaPlayer for RecordingPlayer {
    fn assign_clip(&mut self, clip: ClipHandle) {
        self.events.borrow_mut().push(MediaEvent::Assigned(clip));
    }

    fn play(&mut self) {
        self.events.borrow_mut().push(MediaEvent::Played);
    }
}

// ============================================================================
// Demo quest fixture
// ============================================================================

/// A small complete quest: three dialog lines, one branching choice,
/// two endings. Loads without warnings.
pub fn demo_repository() -> MemoryRepository {
    MemoryRepository::new()
        .with_text(
            "quests/demo/game_meta",
            r#"game_name: The Cartographer's Debt
plot_summary: A port-town mapmaker settles an old debt in soundings and ink.
"#,
        )
        .with_text(
            "quests/demo/story_summary",
            r#"index: 0
next_structs:
  - index: 1
  - index: 2
"#,
        )
        .with_text(
            "quests/demo/characters_meta",
            r#"characters:
  - id: 1
    name: Maren
    description: A cartographer who charts what others pay to forget.
  - id: 2
    name: Iolo
    description: The harbormaster whose harbor vanished from the maps.
"#,
        )
        .with_text(
            "quests/demo/summary_parts/part_0",
            r#"index: 0
next_structs_idx: [1, 2]
"#,
        )
        .with_text(
            "quests/demo/summary_parts/part_1",
            r#"index: 1
"#,
        )
        .with_text(
            "quests/demo/summary_parts/part_2",
            r#"index: 2
"#,
        )
        .with_text(
            "quests/demo/dialogs/dialog_0",
            r#"- id: 0
  character_id: 1
  character_line: Every map I ever sold was honest. This one is not.
- id: 1
  character_id: 2
  character_line: Then why is my harbor missing from it, Maren?
- id: 2
  character_id: 1
  character_line: You never paid for the soundings. Settle the debt and the harbor returns.
  options:
    - option_text: Pay for the soundings
    - option_text: Refuse and keep the coin
"#,
        )
        .with_text(
            "quests/demo/dialogs/dialog_1",
            r#"- id: 0
  character_id: 2
  character_line: Very well. Coin for candor, and the ledger closes tonight.
- id: 1
  character_id: 1
  character_line: Mark it paid, then. Every fathom of it.
  final_words_of_the_story: The harbor returned to the map, and the map to its maker.
"#,
        )
        .with_text(
            "quests/demo/dialogs/dialog_2",
            r#"- id: 0
  character_id: 2
  character_line: Then the chart stays blind, and so do your buyers.
- id: 1
  character_id: 1
  character_line: Blind waters drown more than ships.
  final_words_of_the_story: The cartographer kept the coin and lost the coast.
"#,
        )
        .with_media("quests/demo/video/char1/latest_u_d")
        .with_media("quests/demo/video/char2/latest_u_d")
        .with_media("quests/demo/video/style/latest_u_d")
        .with_media("quests/demo/audio/bgm")
}

// ============================================================================
// QuestHarness
// ============================================================================

/// A [`QuestSession`] over in-memory content and recording players,
/// plus assertion helpers for session tests.
pub struct QuestHarness {
    pub session: QuestSession,
    pub video: RecordingPlayer,
    pub audio: RecordingPlayer,
}

impl QuestHarness {
    /// Harness over the demo quest.
    pub fn demo() -> Self {
        Self::with_repository(demo_repository(), SessionConfig::new("demo"))
    }

    /// Demo harness with a short final-words countdown.
    pub fn demo_with_ticks(ticks: u32) -> Self {
        Self::with_repository(
            demo_repository(),
            SessionConfig::new("demo").with_final_words_ticks(ticks),
        )
    }

    /// Harness over an empty repository; every load fails.
    pub fn broken() -> Self {
        Self::with_repository(MemoryRepository::new(), SessionConfig::new("demo"))
    }

    pub fn with_repository(repo: MemoryRepository, config: SessionConfig) -> Self {
        let video = RecordingPlayer::new();
        let audio = RecordingPlayer::new();
        let stage = Stage::new(
            Box::new(video.clone()),
            Box::new(audio.clone()),
            TextReveal::new(Box::new(TextBuffer::new())),
            TextReveal::new(Box::new(TextBuffer::new())),
        );
        let session = QuestSession::new(config, Box::new(repo), stage);
        Self {
            session,
            video,
            audio,
        }
    }

    /// Run `count` session ticks.
    pub fn tick(&mut self, count: usize) {
        for _ in 0..count {
            self.session.tick();
        }
    }

    /// Tick until both text reveals settle, with a safety bound.
    ///
    /// Careful around the final-words screen: its countdown keeps
    /// running while this ticks.
    pub fn settle(&mut self) {
        for _ in 0..1000 {
            let stage = self.session.stage();
            if stage.title.is_settled() && stage.dialog.is_settled() {
                return;
            }
            self.session.tick();
        }
        panic!("session reveals did not settle");
    }

    #[track_caller]
    pub fn assert_state(&self, expected: QuestState) {
        assert_eq!(self.session.state(), expected, "session state");
    }

    #[track_caller]
    pub fn assert_cursor(&self, branch: BranchIndex, node: usize) {
        assert_eq!(
            self.session.cursor(),
            Some(Cursor { branch, node }),
            "cursor position"
        );
    }

    #[track_caller]
    pub fn assert_option_count(&self, expected: usize) {
        assert_eq!(self.session.options().len(), expected, "option count");
    }

    #[track_caller]
    pub fn assert_error_entries(&self, expected: usize) {
        let entries = self
            .session
            .transitions()
            .iter()
            .filter(|transition| transition.to == QuestState::Error)
            .count();
        assert_eq!(entries, expected, "error entries");
    }
}
