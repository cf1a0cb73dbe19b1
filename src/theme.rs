//! Centralized color theme for the TUI.
//!
//! Defines a `Theme` struct with named color slots for every semantic role used
//! across the UI. Two palettes are provided, dark (default) and light, and a
//! runtime toggle switches between them with Ctrl+T.

use ratatui::style::Color;

/// Which palette is currently active.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThemeMode {
    Dark,
    Light,
}

/// A complete color palette for the TUI.
///
/// Every color used by the UI is looked up here; no hardcoded `Color::*`
/// constants elsewhere in the codebase.
#[derive(Debug, Clone)]
pub struct Theme {
    pub mode: ThemeMode,

    // ── Background ─────────────────────────────────────────────────────
    pub bg: Color,

    // ── Surfaces / borders ───────────────────────────────────────────────
    pub border: Color,
    pub border_focused: Color,
    pub title: Color,

    // ── Text ─────────────────────────────────────────────────────────────
    pub text: Color,
    pub text_dim: Color,
    pub placeholder: Color,

    // ── Accents ──────────────────────────────────────────────────────────
    pub accent: Color,
    pub accent_bg: Color,
    pub accent_on_bg: Color,

    // ── Card preview ─────────────────────────────────────────────────────
    pub card_bg: Color,
    pub card_text: Color,
    pub card_caption: Color,
    pub card_chip: Color,
    pub card_logo_left: Color,
    pub card_logo_right: Color,

    // ── Status / hints ───────────────────────────────────────────────────
    pub error: Color,
    pub success: Color,
    pub busy: Color,
    pub hint_key: Color,
    pub hint_text: Color,
}

impl Theme {
    /// Dark theme: deep background, purple accent, black card.
    pub fn dark() -> Self {
        Self {
            mode: ThemeMode::Dark,

            bg: Color::Rgb(25, 20, 35),

            border: Color::Rgb(100, 80, 140),
            border_focused: Color::Rgb(180, 130, 255),
            title: Color::Rgb(180, 130, 255),

            text: Color::Rgb(220, 220, 220),
            text_dim: Color::Rgb(120, 115, 130),
            placeholder: Color::Rgb(100, 100, 110),

            accent: Color::Rgb(180, 130, 255),
            accent_bg: Color::Rgb(180, 130, 255),
            accent_on_bg: Color::Rgb(20, 15, 30),

            card_bg: Color::Rgb(10, 10, 12),
            card_text: Color::Rgb(235, 235, 235),
            card_caption: Color::Rgb(150, 150, 160),
            card_chip: Color::Rgb(220, 180, 100),
            card_logo_left: Color::Rgb(235, 0, 27),
            card_logo_right: Color::Rgb(247, 158, 27),

            error: Color::Rgb(255, 100, 100),
            success: Color::Rgb(100, 220, 100),
            busy: Color::Rgb(220, 180, 100),
            hint_key: Color::Rgb(140, 200, 140),
            hint_text: Color::Rgb(120, 115, 130),
        }
    }

    /// Light theme: off-white background, deeper purples.
    pub fn light() -> Self {
        Self {
            mode: ThemeMode::Light,

            bg: Color::Rgb(240, 236, 245),

            border: Color::Rgb(180, 160, 200),
            border_focused: Color::Rgb(120, 60, 200),
            title: Color::Rgb(120, 60, 200),

            text: Color::Rgb(50, 50, 60),
            text_dim: Color::Rgb(110, 100, 120),
            placeholder: Color::Rgb(150, 140, 160),

            accent: Color::Rgb(120, 60, 200),
            accent_bg: Color::Rgb(120, 60, 200),
            accent_on_bg: Color::Rgb(255, 255, 255),

            card_bg: Color::Rgb(30, 30, 36),
            card_text: Color::Rgb(245, 245, 245),
            card_caption: Color::Rgb(170, 170, 180),
            card_chip: Color::Rgb(200, 160, 80),
            card_logo_left: Color::Rgb(235, 0, 27),
            card_logo_right: Color::Rgb(247, 158, 27),

            error: Color::Rgb(200, 40, 40),
            success: Color::Rgb(30, 140, 30),
            busy: Color::Rgb(160, 100, 20),
            hint_key: Color::Rgb(30, 140, 30),
            hint_text: Color::Rgb(140, 130, 150),
        }
    }

    /// Toggle between dark and light palettes.
    pub fn toggle(&mut self) {
        *self = match self.mode {
            ThemeMode::Dark => Self::light(),
            ThemeMode::Light => Self::dark(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips_palette() {
        let mut theme = Theme::dark();
        theme.toggle();
        assert_eq!(theme.mode, ThemeMode::Light);
        assert_eq!(theme.bg, Theme::light().bg);
        theme.toggle();
        assert_eq!(theme.mode, ThemeMode::Dark);
    }
}
