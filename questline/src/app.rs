//! Main application state and logic

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use questline_core::{
    ClipHandle, FsContentRepository, MediaPlayer, QuestSession, SessionConfig, Stage, TextBuffer,
    TextReveal,
};

use crate::ui::theme::QuestTheme;

/// A media player that remembers what it was told, so the UI can show
/// which clip would be on screen and whether it is rolling.
#[derive(Clone, Default)]
pub struct TuiPlayer {
    inner: Rc<RefCell<TuiPlayerState>>,
}

#[derive(Default)]
struct TuiPlayerState {
    clip: Option<ClipHandle>,
    playing: bool,
}

impl TuiPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clip_key(&self) -> Option<String> {
        self.inner.borrow().clip.as_ref().map(|clip| clip.key.clone())
    }

    pub fn is_playing(&self) -> bool {
        self.inner.borrow().playing
    }
}

impl MediaPlayer for TuiPlayer {
    fn assign_clip(&mut self, clip: ClipHandle) {
        let mut state = self.inner.borrow_mut();
        state.clip = Some(clip);
        state.playing = false;
    }

    fn play(&mut self) {
        self.inner.borrow_mut().playing = true;
    }
}

/// Main application state
pub struct App {
    pub session: QuestSession,
    pub theme: QuestTheme,
    pub video: TuiPlayer,
    pub audio: TuiPlayer,

    /// Highlighted entry on the option screen.
    pub selected_option: usize,

    /// True between a mouse press and its release, so a held button
    /// advances only once.
    pub pointer_held: bool,

    pub should_quit: bool,
}

impl App {
    pub fn new(quest: String, content_root: PathBuf) -> Self {
        let video = TuiPlayer::new();
        let audio = TuiPlayer::new();
        let stage = Stage::new(
            Box::new(video.clone()),
            Box::new(audio.clone()),
            TextReveal::new(Box::new(TextBuffer::new())),
            TextReveal::new(Box::new(TextBuffer::new())),
        );
        let repo = Box::new(FsContentRepository::new(content_root));
        let session = QuestSession::new(SessionConfig::new(quest), repo, stage);

        Self {
            session,
            theme: QuestTheme::default(),
            video,
            audio,
            selected_option: 0,
            pointer_held: false,
            should_quit: false,
        }
    }

    /// Load the quest and open the menu.
    pub fn start(&mut self) {
        self.session.start();
    }

    /// Advance animations and the ending countdown.
    pub fn tick(&mut self) {
        self.session.tick();
    }

    /// Player pressed the advance control.
    pub fn advance(&mut self) {
        self.session.advance_dialog();
        self.selected_option = 0;
    }

    pub fn select_highlighted(&mut self) {
        self.select(self.selected_option);
    }

    pub fn select(&mut self, index: usize) {
        self.session.select_option(index);
        self.selected_option = 0;
    }

    pub fn highlight_up(&mut self) {
        self.selected_option = self.selected_option.saturating_sub(1);
    }

    pub fn highlight_down(&mut self) {
        let count = self.session.options().len();
        if count > 0 && self.selected_option + 1 < count {
            self.selected_option += 1;
        }
    }

    pub fn retry(&mut self) {
        self.session.retry();
    }

    pub fn return_to_menu(&mut self) {
        self.session.return_to_menu();
    }
}
