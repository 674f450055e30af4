//! Color theme and styling for the quest TUI

use ratatui::style::{Color, Modifier, Style};

/// Quest UI color theme
#[derive(Debug, Clone)]
pub struct QuestTheme {
    pub foreground: Color,
    pub border: Color,
    pub border_error: Color,

    /// Dialog and title text carry per-character reveal alpha, so they
    /// are kept as RGB and scaled toward black.
    pub dialog_rgb: (u8, u8, u8),
    pub title_rgb: (u8, u8, u8),

    pub speaker_text: Color,
    pub option_text: Color,
    pub option_selected: Color,
    pub final_text: Color,
    pub error_text: Color,
    pub hint_text: Color,
    pub media_text: Color,
}

impl Default for QuestTheme {
    fn default() -> Self {
        Self {
            foreground: Color::White,
            border: Color::DarkGray,
            border_error: Color::Red,

            dialog_rgb: (230, 230, 215),
            title_rgb: (240, 215, 150),

            speaker_text: Color::Yellow,
            option_text: Color::White,
            option_selected: Color::Cyan,
            final_text: Color::LightMagenta,
            error_text: Color::Red,
            hint_text: Color::DarkGray,
            media_text: Color::DarkGray,
        }
    }
}

fn scaled(rgb: (u8, u8, u8), alpha: u8) -> Color {
    let scale = |channel: u8| ((channel as u16 * alpha as u16) / 255) as u8;
    Color::Rgb(scale(rgb.0), scale(rgb.1), scale(rgb.2))
}

impl QuestTheme {
    /// Get style for normal text
    pub fn text_style(&self) -> Style {
        Style::default().fg(self.foreground)
    }

    /// Get style for dialog text at a reveal alpha
    pub fn dialog_style(&self, alpha: u8) -> Style {
        Style::default().fg(scaled(self.dialog_rgb, alpha))
    }

    /// Get style for the menu title at a reveal alpha
    pub fn title_style(&self, alpha: u8) -> Style {
        Style::default()
            .fg(scaled(self.title_rgb, alpha))
            .add_modifier(Modifier::BOLD)
    }

    /// Get style for the speaker nameplate
    pub fn speaker_style(&self) -> Style {
        Style::default()
            .fg(self.speaker_text)
            .add_modifier(Modifier::BOLD)
    }

    /// Get style for a dialog option row
    pub fn option_style(&self, selected: bool) -> Style {
        if selected {
            Style::default()
                .fg(self.option_selected)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.option_text)
        }
    }

    /// Get style for the closing words of a story
    pub fn final_style(&self) -> Style {
        Style::default()
            .fg(self.final_text)
            .add_modifier(Modifier::ITALIC)
    }

    /// Get style for error text
    pub fn error_style(&self) -> Style {
        Style::default()
            .fg(self.error_text)
            .add_modifier(Modifier::BOLD)
    }

    /// Get style for key hints and status lines
    pub fn hint_style(&self) -> Style {
        Style::default()
            .fg(self.hint_text)
            .add_modifier(Modifier::DIM)
    }

    /// Get style for media placeholder labels
    pub fn media_style(&self) -> Style {
        Style::default().fg(self.media_text)
    }

    /// Get border style
    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    /// Get border style for the error screen
    pub fn error_border_style(&self) -> Style {
        Style::default().fg(self.border_error)
    }
}
