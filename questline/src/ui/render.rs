//! Render orchestration for the quest TUI

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use questline_core::QuestState;

use crate::app::App;
use crate::ui::widgets::{DialogWidget, OptionsWidget, TitleWidget};

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    match app.session.state() {
        QuestState::None | QuestState::Loading => render_loading(frame, app, area),
        QuestState::GameMenu => render_menu(frame, app, area),
        QuestState::Dialog | QuestState::DialogOptions => render_play(frame, app, area),
        QuestState::FinalWords => render_final_words(frame, app, area),
        QuestState::Error => render_error(frame, app, area),
    }
}

/// Render the menu screen: fading title, plot summary, start hint
fn render_menu(frame: &mut Frame, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    frame.render_widget(
        TitleWidget::new(&app.session.stage().title, &app.theme),
        rows[1],
    );

    if let Some(graph) = app.session.graph() {
        let plot = Paragraph::new(graph.meta.plot_summary.as_str())
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .style(app.theme.text_style());
        frame.render_widget(plot, rows[3]);
    }

    let hint = Paragraph::new("Press Enter to play")
        .alignment(Alignment::Center)
        .style(app.theme.hint_style());
    frame.render_widget(hint, rows[4]);

    render_hint_bar(frame, app, rows[6]);
}

/// Render the dialog screen, with the option list when a choice is up
fn render_play(frame: &mut Frame, app: &App, area: Rect) {
    let showing_options = app.session.state() == QuestState::DialogOptions;
    let constraints = if showing_options {
        vec![
            Constraint::Min(4),
            Constraint::Length(6),
            Constraint::Length(6),
            Constraint::Length(1),
        ]
    } else {
        vec![
            Constraint::Min(4),
            Constraint::Length(6),
            Constraint::Length(1),
        ]
    };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    render_scene(frame, app, rows[0]);

    let speaker = speaker_name(app);
    frame.render_widget(
        DialogWidget::new(&app.session.stage().dialog, &app.theme).speaker(speaker.as_deref()),
        rows[1],
    );

    if showing_options {
        frame.render_widget(
            OptionsWidget::new(app.session.options(), &app.theme).selected(app.selected_option),
            rows[2],
        );
        render_hint_bar(frame, app, rows[3]);
    } else {
        render_hint_bar(frame, app, rows[2]);
    }
}

/// Render the story ending screen
fn render_final_words(frame: &mut Frame, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    let words = Paragraph::new(app.session.stage().dialog.surface().text())
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .style(app.theme.final_style());
    frame.render_widget(words, rows[1]);

    if let Some(remaining) = app.session.final_words_remaining() {
        let hint = Paragraph::new(format!("Returning to the menu in {remaining}..."))
            .alignment(Alignment::Center)
            .style(app.theme.hint_style());
        frame.render_widget(hint, rows[2]);
    }

    render_hint_bar(frame, app, rows[4]);
}

/// Render the error screen
fn render_error(frame: &mut Frame, app: &App, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(area);

    let block = Block::default()
        .title(" Error ")
        .borders(Borders::ALL)
        .border_style(app.theme.error_border_style());
    let inner = block.inner(rows[0]);
    frame.render_widget(block, rows[0]);

    let message = app.session.last_error().unwrap_or("something went wrong");
    let recover = if app.session.graph().is_some() {
        "r retry the load, m back to the menu, q quit"
    } else {
        "r retry the load, q quit"
    };
    let body = vec![
        Line::from(""),
        Line::from(Span::styled(message.to_string(), app.theme.error_style())),
        Line::from(""),
        Line::from(Span::styled(recover, app.theme.hint_style())),
    ];
    frame.render_widget(
        Paragraph::new(body)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        inner,
    );

    render_hint_bar(frame, app, rows[1]);
}

/// Render the pre-menu screen shown before the first load finishes
fn render_loading(frame: &mut Frame, app: &App, area: Rect) {
    let message = format!("Loading {}...", app.session.config().quest);
    let paragraph = Paragraph::new(message)
        .alignment(Alignment::Center)
        .style(app.theme.hint_style());
    frame.render_widget(paragraph, area);
}

/// Stand-in for the video layer: shows which clips would be playing
fn render_scene(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Scene ")
        .borders(Borders::ALL)
        .border_style(app.theme.border_style());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();
    if let Some(key) = app.video.clip_key() {
        let marker = if app.video.is_playing() { "▶" } else { "⏸" };
        lines.push(Line::from(vec![
            Span::styled(format!("{marker} video "), app.theme.hint_style()),
            Span::styled(key, app.theme.media_style()),
        ]));
    }
    if let Some(key) = app.audio.clip_key() {
        let marker = if app.audio.is_playing() { "♪" } else { " " };
        lines.push(Line::from(vec![
            Span::styled(format!("{marker} audio "), app.theme.hint_style()),
            Span::styled(key, app.theme.media_style()),
        ]));
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

/// The engine assigns the talking character's clip to the video player,
/// so the current clip identifies the speaker.
fn speaker_name(app: &App) -> Option<String> {
    let key = app.video.clip_key()?;
    let graph = app.session.graph()?;
    graph
        .character_ids()
        .into_iter()
        .filter_map(|id| graph.character(id))
        .find(|character| character.video_clips.iter().any(|clip| clip.key == key))
        .map(|character| character.name.clone())
}

/// Render the bottom key-hint bar
fn render_hint_bar(frame: &mut Frame, app: &App, area: Rect) {
    let hint = match app.session.state() {
        QuestState::GameMenu => " Enter play | q quit ",
        QuestState::Dialog => " Enter/Space/click advance | q quit ",
        QuestState::DialogOptions => " 1-9 pick | Up/Down move | Enter confirm | q quit ",
        QuestState::FinalWords => " m menu | q quit ",
        QuestState::Error => " r retry | q quit ",
        _ => " loading ",
    };
    frame.render_widget(Paragraph::new(hint).style(app.theme.hint_style()), area);
}
