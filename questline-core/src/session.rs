//! Quest session state machine.
//!
//! [`QuestSession`] owns the top-level UI/game state and every
//! collaborator the quest drives: the content repository, the video and
//! audio players, and the title and dialog text reveals. State changes
//! go through [`QuestSession::request`], which checks the transition
//! table, runs the new state's entry action, and redirects to
//! [`QuestState::Error`] when an entry action fails. Input handlers call
//! [`QuestSession::advance_dialog`] and [`QuestSession::select_option`];
//! the host calls [`QuestSession::tick`] at a fixed interval to drive
//! text animation and the final-words countdown.

use std::fmt;

use rand::seq::SliceRandom;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::content::{ClipHandle, ContentRepository};
use crate::loader::{self, LoadError};
use crate::media::MediaPlayer;
use crate::reveal::TextReveal;
use crate::story::{BranchIndex, DialogNode, StoryGraph};

/// Top-level session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestState {
    None,
    Loading,
    GameMenu,
    Dialog,
    DialogOptions,
    FinalWords,
    Error,
}

impl QuestState {
    /// All states, for exhaustive checks.
    pub fn all() -> [QuestState; 7] {
        [
            QuestState::None,
            QuestState::Loading,
            QuestState::GameMenu,
            QuestState::Dialog,
            QuestState::DialogOptions,
            QuestState::FinalWords,
            QuestState::Error,
        ]
    }
}

impl fmt::Display for QuestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuestState::None => "none",
            QuestState::Loading => "loading",
            QuestState::GameMenu => "game menu",
            QuestState::Dialog => "dialog",
            QuestState::DialogOptions => "dialog options",
            QuestState::FinalWords => "final words",
            QuestState::Error => "error",
        };
        f.write_str(name)
    }
}

/// The transition table. Every state may enter `Error` except `Error`
/// itself; everything else is the explicit quest flow.
pub fn can_transition(from: QuestState, to: QuestState) -> bool {
    use QuestState::*;

    if to == Error {
        return from != Error;
    }
    matches!(
        (from, to),
        (None, Loading)
            | (Loading, GameMenu)
            | (GameMenu, Dialog)
            | (Dialog, DialogOptions)
            | (Dialog, FinalWords)
            | (DialogOptions, Dialog)
            | (FinalWords, GameMenu)
            | (Error, Loading)
            | (Error, GameMenu)
    )
}

/// Errors surfaced by session entry actions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("load error: {0}")]
    Load(#[from] LoadError),

    #[error("no story graph loaded")]
    NotLoaded,

    #[error("entry branch {index} is not loaded")]
    NoEntryBranch { index: BranchIndex },

    #[error("branch {index} has no dialog nodes")]
    EmptyBranch { index: BranchIndex },

    #[error("dialog cursor is not set")]
    NoCursor,

    #[error("branch {index} is not loaded")]
    UnknownBranch { index: BranchIndex },
}

/// Session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Quest folder name; content keys live under `quests/<quest>/`.
    pub quest: String,

    /// Ticks the final-words screen stays up before returning to the
    /// menu. 50 ticks is five seconds at the host's 100 ms interval.
    pub final_words_ticks: u32,
}

impl SessionConfig {
    pub fn new(quest: impl Into<String>) -> Self {
        Self {
            quest: quest.into(),
            final_words_ticks: 50,
        }
    }

    pub fn with_final_words_ticks(mut self, ticks: u32) -> Self {
        self.final_words_ticks = ticks;
        self
    }
}

/// The presentation surfaces a session drives: one video player, one
/// audio player, and the two animated text elements.
pub struct Stage {
    pub video: Box<dyn MediaPlayer>,
    pub audio: Box<dyn MediaPlayer>,
    pub title: TextReveal,
    pub dialog: TextReveal,
}

impl Stage {
    pub fn new(
        video: Box<dyn MediaPlayer>,
        audio: Box<dyn MediaPlayer>,
        title: TextReveal,
        dialog: TextReveal,
    ) -> Self {
        Self {
            video,
            audio,
            title,
            dialog,
        }
    }
}

/// Position of the live dialog cursor: the next node to display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub branch: BranchIndex,
    pub node: usize,
}

/// One selectable entry while in [`QuestState::DialogOptions`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionEntry {
    pub text: String,
    pub target: BranchIndex,
}

/// A state entry that actually ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: QuestState,
    pub to: QuestState,
}

/// An interactive quest playthrough.
pub struct QuestSession {
    id: Uuid,
    config: SessionConfig,
    repo: Box<dyn ContentRepository>,
    stage: Stage,
    state: QuestState,
    graph: Option<StoryGraph>,
    cursor: Option<Cursor>,
    options: Vec<OptionEntry>,
    final_words_timer: Option<u32>,
    last_error: Option<String>,
    transitions: Vec<Transition>,
}

impl QuestSession {
    pub fn new(config: SessionConfig, repo: Box<dyn ContentRepository>, stage: Stage) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            repo,
            stage,
            state: QuestState::None,
            graph: None,
            cursor: None,
            options: Vec::new(),
            final_words_timer: None,
            last_error: None,
            transitions: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> QuestState {
        self.state
    }

    pub fn graph(&self) -> Option<&StoryGraph> {
        self.graph.as_ref()
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    /// The node the cursor points at, if both cursor and graph are live.
    pub fn current_node(&self) -> Option<&DialogNode> {
        let cursor = self.cursor?;
        self.graph.as_ref()?.node(cursor.branch, cursor.node)
    }

    pub fn options(&self) -> &[OptionEntry] {
        &self.options
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Ticks left on the final-words screen, when it is up.
    pub fn final_words_remaining(&self) -> Option<u32> {
        self.final_words_timer
    }

    /// Every state entry since construction, in order.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Begin the session: load content, then open the menu. A load
    /// failure lands on the error screen without touching the menu.
    pub fn start(&mut self) {
        info!(session = %self.id, quest = %self.config.quest, "session start");
        self.request(QuestState::Loading);
        if self.state == QuestState::Loading {
            self.request(QuestState::GameMenu);
        }
    }

    /// Reload content from the error screen.
    pub fn retry(&mut self) {
        self.request(QuestState::Loading);
        if self.state == QuestState::Loading {
            self.request(QuestState::GameMenu);
        }
    }

    /// Back to the menu from the error screen, reusing the loaded
    /// graph. Ignored when nothing is loaded.
    pub fn return_to_menu(&mut self) {
        if self.graph.is_none() {
            warn!(session = %self.id, "cannot return to menu, no story loaded");
            return;
        }
        self.request(QuestState::GameMenu);
    }

    /// Tear the session down: cancel animations and the countdown,
    /// discard the graph, return to `None`.
    pub fn stop(&mut self) {
        info!(session = %self.id, "session stop");
        self.final_words_timer = None;
        self.stage.title.cancel();
        self.stage.dialog.cancel();
        self.graph = None;
        self.cursor = None;
        self.options.clear();
        self.last_error = None;
        self.state = QuestState::None;
    }

    /// Player input: show the next dialog line. From the menu this
    /// starts the dialog; in dialog it re-runs display and advancement
    /// for the current cursor. Anywhere else it is ignored.
    pub fn advance_dialog(&mut self) {
        match self.state {
            QuestState::GameMenu => self.request(QuestState::Dialog),
            QuestState::Dialog => {
                if let Err(error) = self.show_dialog() {
                    self.fail(error);
                }
            }
            _ => {
                warn!(session = %self.id, state = %self.state, "advance ignored");
            }
        }
    }

    /// Player input: pick option `index`. Out-of-range picks are
    /// ignored; a valid pick jumps the cursor to the target branch and
    /// re-enters dialog.
    pub fn select_option(&mut self, index: usize) {
        if self.state != QuestState::DialogOptions {
            warn!(session = %self.id, state = %self.state, "option select ignored");
            return;
        }
        let Some(entry) = self.options.get(index) else {
            warn!(
                session = %self.id,
                index,
                count = self.options.len(),
                "option index out of range"
            );
            return;
        };
        let target = entry.target;

        // The loader validates option targets, so a miss here means the
        // graph was swapped out from under the session.
        let Some(graph) = self.graph.as_ref() else {
            self.fail(SessionError::NotLoaded);
            return;
        };
        if graph.branch(target).is_none() {
            self.fail(SessionError::UnknownBranch { index: target });
            return;
        }

        debug!(session = %self.id, index, target, "option selected");
        self.cursor = Some(Cursor {
            branch: target,
            node: 0,
        });
        self.options.clear();
        self.request(QuestState::Dialog);
    }

    /// Fixed-interval tick: drives both text reveals and the
    /// final-words countdown.
    pub fn tick(&mut self) {
        self.stage.title.tick();
        self.stage.dialog.tick();

        if let Some(remaining) = self.final_words_timer {
            if remaining <= 1 {
                self.final_words_timer = None;
                debug!(session = %self.id, "final words countdown elapsed");
                self.request(QuestState::GameMenu);
            } else {
                self.final_words_timer = Some(remaining - 1);
            }
        }
    }

    /// Requests a state change. Disallowed transitions are logged and
    /// ignored. When the new state's entry action fails, the session
    /// redirects to [`QuestState::Error`] instead of propagating.
    pub fn request(&mut self, to: QuestState) {
        let from = self.state;
        if !can_transition(from, to) {
            warn!(session = %self.id, %from, %to, "transition rejected");
            return;
        }
        debug!(session = %self.id, %from, %to, "transition");
        if from == QuestState::FinalWords {
            // Leaving the final-words screen always disarms the
            // auto-return.
            self.final_words_timer = None;
        }
        self.state = to;
        self.transitions.push(Transition { from, to });
        if let Err(error) = self.enter(to) {
            self.fail(error);
        }
    }

    /// Redirect to the error screen with `error` as the message.
    fn fail(&mut self, error: SessionError) {
        error!(session = %self.id, %error, "session failed");
        self.last_error = Some(error.to_string());
        self.final_words_timer = None;
        let from = self.state;
        self.state = QuestState::Error;
        self.transitions.push(Transition {
            from,
            to: QuestState::Error,
        });
    }

    fn enter(&mut self, state: QuestState) -> Result<(), SessionError> {
        match state {
            QuestState::None | QuestState::Error => Ok(()),
            QuestState::Loading => self.load_resources(),
            QuestState::GameMenu => self.show_menu(),
            QuestState::Dialog => self.show_dialog(),
            QuestState::DialogOptions => self.show_options(),
            QuestState::FinalWords => self.show_final_words(),
        }
    }

    /// LOADING entry: build the graph, resolve media, stage the loading
    /// screen. Video shows one random clip drawn from the cast plus the
    /// background; music is assigned but not started until the menu.
    fn load_resources(&mut self) -> Result<(), SessionError> {
        let quest = self.config.quest.clone();
        info!(session = %self.id, quest = %quest, "loading quest content");

        let mut graph = loader::load(self.repo.as_ref(), &quest)?;
        loader::load_media(self.repo.as_ref(), &quest, &mut graph)?;

        let mut loading_clips: Vec<ClipHandle> = Vec::new();
        for id in graph.character_ids() {
            if let Some(clip) = graph.character(id).and_then(|c| c.video_clips.first()) {
                loading_clips.push(clip.clone());
            }
        }
        if let Some(clip) = graph.meta.bg_video_clips.first() {
            loading_clips.push(clip.clone());
        }
        if let Some(clip) = loading_clips.choose(&mut rand::thread_rng()) {
            self.stage.video.assign_clip(clip.clone());
        }
        if let Some(clip) = graph.meta.bgm_clips.first() {
            self.stage.audio.assign_clip(clip.clone());
        }

        info!(
            session = %self.id,
            branches = graph.branch_count(),
            characters = graph.character_count(),
            warnings = graph.warnings().len(),
            "quest content loaded"
        );
        self.last_error = None;
        self.graph = Some(graph);
        Ok(())
    }

    /// GAME_MENU entry: start playback, reveal the title, park the
    /// cursor on the entry branch's first node.
    fn show_menu(&mut self) -> Result<(), SessionError> {
        let (root, title) = {
            let graph = self.graph.as_ref().ok_or(SessionError::NotLoaded)?;
            let root = graph.root_index();
            let branch = graph
                .branch(root)
                .ok_or(SessionError::NoEntryBranch { index: root })?;
            if branch.nodes.is_empty() {
                return Err(SessionError::EmptyBranch { index: root });
            }
            (root, graph.meta.game_name.clone())
        };

        self.stage.video.play();
        self.stage.audio.play();
        self.stage.title.set_text(title);
        self.stage.title.set_fade();
        self.cursor = Some(Cursor {
            branch: root,
            node: 0,
        });
        self.options.clear();
        self.last_error = None;
        Ok(())
    }

    /// DIALOG entry, also re-run on every advance while in dialog:
    /// display the cursor node, then apply the advancement policy.
    fn show_dialog(&mut self) -> Result<(), SessionError> {
        enum Advance {
            Next(usize),
            Options,
            FinalWords,
            Stay,
        }

        let (line, clip, advance) = {
            let cursor = self.cursor.ok_or(SessionError::NoCursor)?;
            let graph = self.graph.as_ref().ok_or(SessionError::NotLoaded)?;
            let node = graph
                .node(cursor.branch, cursor.node)
                .ok_or(SessionError::UnknownBranch {
                    index: cursor.branch,
                })?;

            let clip = node
                .character
                .and_then(|id| graph.character(id))
                .and_then(|character| character.video_clips.first())
                .cloned();
            if clip.is_none() {
                warn!(
                    session = %self.id,
                    branch = cursor.branch,
                    node = cursor.node,
                    "no character clip for dialog line"
                );
            }

            let advance = if let Some(next) = node.next {
                Advance::Next(next)
            } else if node.has_options() {
                Advance::Options
            } else if node.final_words.is_some() {
                Advance::FinalWords
            } else {
                // Dead-end tail, flagged at load. The line stays up.
                Advance::Stay
            };
            (node.line.clone(), clip, advance)
        };

        debug!(session = %self.id, line = %line, "showing dialog line");
        self.stage.dialog.set_text(line);
        self.stage.dialog.set_fade();
        if let Some(clip) = clip {
            self.stage.video.assign_clip(clip);
        }

        match advance {
            Advance::Next(next) => {
                if let Some(cursor) = self.cursor.as_mut() {
                    cursor.node = next;
                }
            }
            Advance::Options => self.request(QuestState::DialogOptions),
            Advance::FinalWords => self.request(QuestState::FinalWords),
            Advance::Stay => {}
        }
        Ok(())
    }

    /// DIALOG_OPTIONS entry: expose the tail node's options,
    /// top-to-bottom.
    fn show_options(&mut self) -> Result<(), SessionError> {
        let cursor = self.cursor.ok_or(SessionError::NoCursor)?;
        let graph = self.graph.as_ref().ok_or(SessionError::NotLoaded)?;
        let node = graph
            .node(cursor.branch, cursor.node)
            .ok_or(SessionError::UnknownBranch {
                index: cursor.branch,
            })?;

        let entries: Vec<OptionEntry> = node
            .options
            .iter()
            .map(|option| OptionEntry {
                text: option.text.clone(),
                target: option.target,
            })
            .collect();
        debug!(session = %self.id, count = entries.len(), "showing options");
        self.options = entries;
        Ok(())
    }

    /// FINAL_WORDS entry: show the closing text at full visibility and
    /// arm the auto-return countdown.
    fn show_final_words(&mut self) -> Result<(), SessionError> {
        let words = {
            let cursor = self.cursor.ok_or(SessionError::NoCursor)?;
            let graph = self.graph.as_ref().ok_or(SessionError::NotLoaded)?;
            let node = graph
                .node(cursor.branch, cursor.node)
                .ok_or(SessionError::UnknownBranch {
                    index: cursor.branch,
                })?;
            node.final_words.clone().unwrap_or_default()
        };

        debug!(session = %self.id, "showing final words");
        self.stage.dialog.set_text(words);
        self.stage.dialog.set_target_alpha();
        self.final_words_timer = Some(self.config.final_words_ticks);
        Ok(())
    }
}
