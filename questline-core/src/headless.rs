//! Scripted quest playthroughs without a UI.
//!
//! [`HeadlessRunner`] drives a [`QuestSession`] through one playthrough,
//! feeding pre-scripted option choices and collecting a transcript of
//! what a player would have seen. Used by `questline --headless` and by
//! integration tests.

use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;

use tracing::info;

use crate::content::{ContentRepository, FsContentRepository};
use crate::media::NullPlayer;
use crate::reveal::TextReveal;
use crate::session::{QuestSession, QuestState, SessionConfig, Stage};
use crate::surface::TextBuffer;

/// Settings for a headless run.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    pub quest: String,

    /// Root directory for [`FsContentRepository`].
    pub content_root: PathBuf,

    /// Option indices to pick, in order. When the script runs out the
    /// runner picks option 0.
    pub choices: Vec<usize>,

    /// Upper bound on loop steps, so a dead-end story cannot hang the
    /// runner.
    pub max_steps: usize,
}

impl HeadlessConfig {
    pub fn new(quest: impl Into<String>) -> Self {
        Self {
            quest: quest.into(),
            content_root: PathBuf::from("content"),
            choices: Vec::new(),
            max_steps: 200,
        }
    }

    pub fn with_content_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.content_root = root.into();
        self
    }

    pub fn with_choices(mut self, choices: Vec<usize>) -> Self {
        self.choices = choices;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }
}

/// One event a player would have seen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEntry {
    /// The menu opened, showing the quest title.
    Menu { title: String },
    /// A dialog line was displayed.
    Line { text: String },
    /// A choice was offered.
    Options { options: Vec<String> },
    /// The runner picked an option.
    Chose { index: usize, text: String },
    /// The story ended with its closing text.
    FinalWords { text: String },
    /// The session landed on the error screen.
    Failed { message: String },
}

impl fmt::Display for TranscriptEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptEntry::Menu { title } => write!(f, "=== {title} ==="),
            TranscriptEntry::Line { text } => f.write_str(text),
            TranscriptEntry::Options { options } => {
                for (index, option) in options.iter().enumerate() {
                    if index > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "  {}) {option}", index + 1)?;
                }
                Ok(())
            }
            TranscriptEntry::Chose { text, .. } => write!(f, "> {text}"),
            TranscriptEntry::FinalWords { text } => write!(f, "--- {text}"),
            TranscriptEntry::Failed { message } => write!(f, "error: {message}"),
        }
    }
}

/// Drives one scripted playthrough and records the transcript.
pub struct HeadlessRunner {
    session: QuestSession,
    choices: VecDeque<usize>,
    max_steps: usize,
    transcript: Vec<TranscriptEntry>,
}

impl HeadlessRunner {
    /// Runner over on-disk content at the configured root.
    pub fn new(config: HeadlessConfig) -> Self {
        let repo = FsContentRepository::new(config.content_root.clone());
        Self::with_repository(config, Box::new(repo))
    }

    /// Runner over any repository; `content_root` is ignored.
    pub fn with_repository(config: HeadlessConfig, repo: Box<dyn ContentRepository>) -> Self {
        let stage = Stage::new(
            Box::new(NullPlayer),
            Box::new(NullPlayer),
            TextReveal::new(Box::new(TextBuffer::new())),
            TextReveal::new(Box::new(TextBuffer::new())),
        );
        let session = QuestSession::new(SessionConfig::new(config.quest.clone()), repo, stage);
        Self {
            session,
            choices: config.choices.into_iter().collect(),
            max_steps: config.max_steps,
            transcript: Vec::new(),
        }
    }

    pub fn session(&self) -> &QuestSession {
        &self.session
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    /// Play through the quest once: start, walk the dialog, take the
    /// scripted choices, ride the final-words countdown back to the
    /// menu. Returns the transcript.
    pub fn run(&mut self) -> &[TranscriptEntry] {
        info!(quest = %self.session.config().quest, "headless run");
        self.session.start();

        let mut menu_seen = false;
        let mut last_line: Option<String> = None;

        for _ in 0..self.max_steps {
            match self.session.state() {
                QuestState::GameMenu => {
                    if menu_seen {
                        // Back at the menu: the playthrough is over.
                        break;
                    }
                    menu_seen = true;
                    let title = self
                        .session
                        .graph()
                        .map(|graph| graph.meta.game_name.clone())
                        .unwrap_or_default();
                    self.transcript.push(TranscriptEntry::Menu { title });
                    self.session.advance_dialog();
                }
                QuestState::Dialog => {
                    // The displayed line is whatever the reveal queue
                    // settles on; the cursor has already moved past it.
                    self.settle();
                    let text = self.session.stage().dialog.surface().text().to_string();
                    self.record_line(&mut last_line, text);
                    self.session.advance_dialog();
                }
                QuestState::DialogOptions => {
                    // The cursor is parked on the branch tail here.
                    let tail_line = self.session.current_node().map(|node| node.line.clone());
                    if let Some(line) = tail_line {
                        self.record_line(&mut last_line, line);
                    }
                    let options: Vec<String> = self
                        .session
                        .options()
                        .iter()
                        .map(|option| option.text.clone())
                        .collect();
                    self.transcript.push(TranscriptEntry::Options {
                        options: options.clone(),
                    });

                    let scripted = self.choices.pop_front().unwrap_or(0);
                    let index = if scripted < options.len() { scripted } else { 0 };
                    let text = options.get(index).cloned().unwrap_or_default();
                    self.transcript.push(TranscriptEntry::Chose { index, text });
                    self.session.select_option(index);
                }
                QuestState::FinalWords => {
                    let parked = self
                        .session
                        .current_node()
                        .map(|node| (node.line.clone(), node.final_words.clone()));
                    if let Some((line, words)) = parked {
                        self.record_line(&mut last_line, line);
                        if let Some(words) = words {
                            self.transcript
                                .push(TranscriptEntry::FinalWords { text: words });
                        }
                    }
                    let countdown = self.session.config().final_words_ticks as usize + 1;
                    for _ in 0..countdown {
                        if self.session.state() != QuestState::FinalWords {
                            break;
                        }
                        self.session.tick();
                    }
                }
                QuestState::Error => {
                    let message = self
                        .session
                        .last_error()
                        .unwrap_or("unknown error")
                        .to_string();
                    self.transcript.push(TranscriptEntry::Failed { message });
                    break;
                }
                QuestState::None | QuestState::Loading => break,
            }
        }
        &self.transcript
    }

    fn record_line(&mut self, last_line: &mut Option<String>, text: String) {
        if text.is_empty() || last_line.as_deref() == Some(text.as_str()) {
            return;
        }
        *last_line = Some(text.clone());
        self.transcript.push(TranscriptEntry::Line { text });
    }

    /// Tick until both reveals settle, bounded.
    fn settle(&mut self) {
        for _ in 0..1000 {
            let stage = self.session.stage();
            if stage.title.is_settled() && stage.dialog.is_settled() {
                return;
            }
            self.session.tick();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{demo_repository, MemoryRepository};

    fn runner(choices: Vec<usize>) -> HeadlessRunner {
        HeadlessRunner::with_repository(
            HeadlessConfig::new("demo").with_choices(choices),
            Box::new(demo_repository()),
        )
    }

    #[test]
    fn test_demo_playthrough_first_choice() {
        let mut runner = runner(vec![0]);
        let transcript = runner.run().to_vec();

        let expected = vec![
            TranscriptEntry::Menu {
                title: "The Cartographer's Debt".to_string(),
            },
            TranscriptEntry::Line {
                text: "Every map I ever sold was honest. This one is not.".to_string(),
            },
            TranscriptEntry::Line {
                text: "Then why is my harbor missing from it, Maren?".to_string(),
            },
            TranscriptEntry::Line {
                text: "You never paid for the soundings. Settle the debt and the harbor returns."
                    .to_string(),
            },
            TranscriptEntry::Options {
                options: vec![
                    "Pay for the soundings".to_string(),
                    "Refuse and keep the coin".to_string(),
                ],
            },
            TranscriptEntry::Chose {
                index: 0,
                text: "Pay for the soundings".to_string(),
            },
            TranscriptEntry::Line {
                text: "Very well. Coin for candor, and the ledger closes tonight.".to_string(),
            },
            TranscriptEntry::Line {
                text: "Mark it paid, then. Every fathom of it.".to_string(),
            },
            TranscriptEntry::FinalWords {
                text: "The harbor returned to the map, and the map to its maker.".to_string(),
            },
        ];
        assert_eq!(transcript, expected);
        assert_eq!(runner.session().state(), QuestState::GameMenu);
    }

    #[test]
    fn test_second_choice_reaches_other_ending() {
        let mut runner = runner(vec![1]);
        let transcript = runner.run();

        assert_eq!(
            transcript.last(),
            Some(&TranscriptEntry::FinalWords {
                text: "The cartographer kept the coin and lost the coast.".to_string(),
            })
        );
    }

    #[test]
    fn test_empty_script_defaults_to_first_option() {
        let mut runner = runner(Vec::new());
        let transcript = runner.run();

        assert!(transcript.contains(&TranscriptEntry::Chose {
            index: 0,
            text: "Pay for the soundings".to_string(),
        }));
    }

    #[test]
    fn test_out_of_range_choice_falls_back() {
        let mut runner = runner(vec![9]);
        let transcript = runner.run();

        assert!(transcript.contains(&TranscriptEntry::Chose {
            index: 0,
            text: "Pay for the soundings".to_string(),
        }));
    }

    #[test]
    fn test_load_failure_is_recorded() {
        let mut runner = HeadlessRunner::with_repository(
            HeadlessConfig::new("demo"),
            Box::new(MemoryRepository::new()),
        );
        let transcript = runner.run().to_vec();

        assert_eq!(transcript.len(), 1);
        assert!(matches!(
            &transcript[0],
            TranscriptEntry::Failed { message } if !message.is_empty()
        ));
        assert_eq!(runner.session().state(), QuestState::Error);
    }
}
