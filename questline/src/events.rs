//! Event handling for the quest TUI

use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use questline_core::QuestState;

use crate::app::App;

/// Result of handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Continue,
    Quit,
    NeedsRedraw,
}

/// Handle a terminal event
pub fn handle_event(app: &mut App, event: Event) -> EventResult {
    match event {
        Event::Key(key) => handle_key_event(app, key),
        Event::Mouse(mouse) => handle_mouse_event(app, mouse),
        Event::Resize(_, _) => EventResult::NeedsRedraw,
        _ => EventResult::Continue,
    }
}

/// Handle a mouse event
fn handle_mouse_event(app: &mut App, mouse: MouseEvent) -> EventResult {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            // One advance per press; a held button does not repeat
            if app.pointer_held {
                return EventResult::Continue;
            }
            app.pointer_held = true;
            app.advance();
            EventResult::NeedsRedraw
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.pointer_held = false;
            EventResult::Continue
        }
        _ => EventResult::Continue,
    }
}

/// Handle a key event
fn handle_key_event(app: &mut App, key: KeyEvent) -> EventResult {
    // Global shortcuts (always work)
    if let (KeyCode::Char('c'), KeyModifiers::CONTROL) = (key.code, key.modifiers) {
        return EventResult::Quit;
    }

    match key.code {
        KeyCode::Char('q') => EventResult::Quit,

        // Advance, or confirm the highlighted option
        KeyCode::Enter | KeyCode::Char(' ') => {
            if app.session.state() == QuestState::DialogOptions {
                app.select_highlighted();
            } else {
                app.advance();
            }
            EventResult::NeedsRedraw
        }

        // Option highlight
        KeyCode::Up | KeyCode::Char('k') => {
            app.highlight_up();
            EventResult::NeedsRedraw
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.highlight_down();
            EventResult::NeedsRedraw
        }

        // Direct option pick
        KeyCode::Char(c @ '1'..='9') => {
            if app.session.state() == QuestState::DialogOptions {
                let index = c.to_digit(10).unwrap() as usize - 1;
                app.select(index);
            }
            EventResult::NeedsRedraw
        }

        // Error and ending screens
        KeyCode::Char('r') => {
            if app.session.state() == QuestState::Error {
                app.retry();
            }
            EventResult::NeedsRedraw
        }
        KeyCode::Char('m') => {
            if matches!(
                app.session.state(),
                QuestState::Error | QuestState::FinalWords
            ) {
                app.return_to_menu();
            }
            EventResult::NeedsRedraw
        }

        _ => EventResult::Continue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState};
    use questline_core::testing::demo_repository;
    use questline_core::{QuestSession, SessionConfig, Stage, TextBuffer, TextReveal};

    use crate::app::TuiPlayer;

    fn demo_app() -> App {
        let video = TuiPlayer::new();
        let audio = TuiPlayer::new();
        let stage = Stage::new(
            Box::new(video.clone()),
            Box::new(audio.clone()),
            TextReveal::new(Box::new(TextBuffer::new())),
            TextReveal::new(Box::new(TextBuffer::new())),
        );
        let session = QuestSession::new(
            SessionConfig::new("demo"),
            Box::new(demo_repository()),
            stage,
        );
        let mut app = App {
            session,
            theme: crate::ui::theme::QuestTheme::default(),
            video,
            audio,
            selected_option: 0,
            pointer_held: false,
            should_quit: false,
        };
        app.start();
        app
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn mouse(kind: MouseEventKind) -> Event {
        Event::Mouse(MouseEvent {
            kind,
            column: 0,
            row: 0,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn test_enter_advances_from_menu() {
        let mut app = demo_app();
        assert_eq!(app.session.state(), QuestState::GameMenu);

        handle_event(&mut app, key(KeyCode::Enter));
        assert_eq!(app.session.state(), QuestState::Dialog);
    }

    #[test]
    fn test_digit_picks_an_option() {
        let mut app = demo_app();
        handle_event(&mut app, key(KeyCode::Enter));
        handle_event(&mut app, key(KeyCode::Enter));
        handle_event(&mut app, key(KeyCode::Enter));
        assert_eq!(app.session.state(), QuestState::DialogOptions);

        handle_event(&mut app, key(KeyCode::Char('2')));
        assert_eq!(app.session.state(), QuestState::Dialog);
        assert_eq!(app.session.cursor().map(|c| c.branch), Some(2));
    }

    #[test]
    fn test_highlight_and_confirm() {
        let mut app = demo_app();
        handle_event(&mut app, key(KeyCode::Enter));
        handle_event(&mut app, key(KeyCode::Enter));
        handle_event(&mut app, key(KeyCode::Enter));

        handle_event(&mut app, key(KeyCode::Down));
        assert_eq!(app.selected_option, 1);
        handle_event(&mut app, key(KeyCode::Down));
        assert_eq!(app.selected_option, 1, "highlight stops at the last option");

        handle_event(&mut app, key(KeyCode::Enter));
        assert_eq!(app.session.cursor().map(|c| c.branch), Some(2));
    }

    #[test]
    fn test_held_mouse_advances_once() {
        let mut app = demo_app();
        assert_eq!(app.session.state(), QuestState::GameMenu);

        handle_event(&mut app, mouse(MouseEventKind::Down(MouseButton::Left)));
        handle_event(&mut app, mouse(MouseEventKind::Down(MouseButton::Left)));
        assert_eq!(app.session.state(), QuestState::Dialog);
        assert_eq!(app.session.cursor().map(|c| c.node), Some(1));

        handle_event(&mut app, mouse(MouseEventKind::Up(MouseButton::Left)));
        handle_event(&mut app, mouse(MouseEventKind::Down(MouseButton::Left)));
        assert_eq!(app.session.cursor().map(|c| c.node), Some(2));
    }

    #[test]
    fn test_quit_keys() {
        let mut app = demo_app();
        assert_eq!(handle_event(&mut app, key(KeyCode::Char('q'))), EventResult::Quit);

        let ctrl_c = Event::Key(KeyEvent {
            code: KeyCode::Char('c'),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        });
        assert_eq!(handle_event(&mut app, ctrl_c), EventResult::Quit);
    }
}
