//! Terminal rendering.
//!
//! `ui()` is a pure function of the interaction state (`App`) and the latest
//! controller snapshot (`FormState`). It is called on every loop iteration and
//! redraws the whole screen; ratatui diffs the buffers and only writes the
//! cells that changed.
//!
//! Screen layout:
//!
//! ```text
//! ┌ header ───────────────────────────────────────────┐
//! │ card preview           │ saved cards              │
//! │ new card form          │                          │
//! └───────────────────────────────────────────────────┘
//!   footer: banner or key hints
//! ```

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};

use crate::app::{App, BannerKind, Focus};
use crate::card::{Field, SavedCard};
use crate::controller::{FormState, Phase};
use crate::theme::Theme;

const HEADER: &str = "Credit Card Management";

// Shown on the preview card while the matching input is empty.
const PREVIEW_NUMBER: &str = "5375 4411 4540 0954";
const PREVIEW_HOLDER: &str = "DONALD FLINCH CORTEZ";
const PREVIEW_EXPIRY: &str = "06/24";

/// Render one frame.
pub fn ui(f: &mut Frame, app: &App, state: &FormState) {
    let theme = &app.theme;
    f.render_widget(
        Block::default().style(Style::default().bg(theme.bg)),
        f.area(),
    );

    let rows = Layout::vertical([
        Constraint::Length(3), // header
        Constraint::Min(1),    // body
        Constraint::Length(1), // footer
    ])
    .split(f.area());

    render_header(f, rows[0], theme);

    let columns =
        Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)]).split(rows[1]);
    let left = Layout::vertical([Constraint::Length(10), Constraint::Min(1)]).split(columns[0]);

    render_preview(f, left[0], state, theme);
    render_form(f, left[1], app, state);
    render_saved(f, columns[1], app, state);
    render_footer(f, rows[2], app);

    // Last, so it sits on top of everything.
    if app.dialog.is_some() {
        render_dialog(f, app);
    }
}

fn panel<'a>(title: impl Into<Line<'a>>, focused: bool, theme: &Theme) -> Block<'a> {
    let border = if focused {
        theme.border_focused
    } else {
        theme.border
    };
    Block::default()
        .borders(Borders::ALL)
        .style(Style::default().bg(theme.bg))
        .border_style(Style::default().fg(border))
        .title(title)
        .title_style(Style::default().fg(theme.title))
}

// ── Header ───────────────────────────────────────────────────────────────────

fn render_header(f: &mut Frame, area: Rect, theme: &Theme) {
    let header = Paragraph::new(Line::from(Span::styled(
        HEADER,
        Style::default()
            .fg(theme.title)
            .add_modifier(Modifier::BOLD),
    )))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .style(Style::default().bg(theme.bg))
            .border_style(Style::default().fg(theme.border)),
    );
    f.render_widget(header, area);
}

// ── Card preview ─────────────────────────────────────────────────────────────

/// `value`, or `placeholder` when the input is still empty.
fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() { placeholder } else { value }
}

fn render_preview(f: &mut Frame, area: Rect, state: &FormState, theme: &Theme) {
    let fields = &state.fields;
    let text = Style::default().fg(theme.card_text).bg(theme.card_bg);
    let caption = Style::default().fg(theme.card_caption).bg(theme.card_bg);

    let lines = vec![
        Line::from(vec![
            Span::styled("monobank", text.add_modifier(Modifier::BOLD)),
            Span::styled(" | Universal Bank", caption),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "▐▀▀▌",
            Style::default().fg(theme.card_chip).bg(theme.card_bg),
        )),
        Line::from(Span::styled(
            or_placeholder(&fields.card_number, PREVIEW_NUMBER),
            text.add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("VALID THRU ", caption),
            Span::styled(or_placeholder(&fields.expiry_date, PREVIEW_EXPIRY), text),
        ]),
        Line::from(Span::styled(
            or_placeholder(&fields.cardholder_name, PREVIEW_HOLDER),
            text,
        )),
        Line::from(vec![
            Span::styled("●", Style::default().fg(theme.card_logo_left).bg(theme.card_bg)),
            Span::styled("●", Style::default().fg(theme.card_logo_right).bg(theme.card_bg)),
        ])
        .alignment(Alignment::Right),
    ];

    // Card-sized box, centered horizontally in the preview area.
    let width = 40u16.min(area.width);
    let card = Rect::new(
        area.x + area.width.saturating_sub(width) / 2,
        area.y,
        width,
        area.height.min(9),
    );
    let widget = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .style(Style::default().bg(theme.card_bg))
            .border_style(Style::default().fg(theme.card_caption)),
    );
    f.render_widget(widget, card);
}

// ── Form ─────────────────────────────────────────────────────────────────────

/// What the input shows: the value (CVV as `*`), or the dimmed placeholder.
fn display_value(field: Field, value: &str) -> String {
    if field.is_secret() {
        "*".repeat(value.chars().count())
    } else {
        value.to_string()
    }
}

fn render_form(f: &mut Frame, area: Rect, app: &App, state: &FormState) {
    let theme = &app.theme;
    let form_focused = app.focus == Focus::Form;
    let block = panel(" New card ", form_focused, theme);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines: Vec<Line> = Vec::new();
    // Row of the focused input inside `inner`, for the cursor.
    let mut cursor_row = None;

    for field in Field::FORM_ORDER {
        let active = form_focused && app.field == field;
        let label_color = if state.errors.contains(field) {
            theme.error
        } else if active {
            theme.accent
        } else {
            theme.text_dim
        };
        let label_style = if active {
            Style::default().fg(label_color).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(label_color)
        };
        lines.push(Line::from(Span::styled(
            format!("{} {}", if active { ">" } else { " " }, field.label()),
            label_style,
        )));

        let value = state.fields.get(field);
        if active {
            cursor_row = Some(lines.len());
        }
        lines.push(if value.is_empty() {
            Line::from(Span::styled(
                format!("  {}", field.placeholder()),
                Style::default().fg(theme.placeholder),
            ))
        } else {
            Line::from(Span::styled(
                format!("  {}", display_value(field, value)),
                Style::default().fg(theme.text),
            ))
        });

        match state.errors.get(field) {
            Some(message) => lines.push(Line::from(Span::styled(
                format!("  {message}"),
                Style::default().fg(theme.error),
            ))),
            None => lines.push(Line::from("")),
        }
    }

    lines.push(match state.phase {
        Phase::Editing => Line::from(Span::styled(
            " Save card ",
            Style::default()
                .fg(theme.accent_on_bg)
                .bg(theme.accent_bg)
                .add_modifier(Modifier::BOLD),
        )),
        Phase::Submitting => Line::from(Span::styled(
            " Saving... ",
            Style::default()
                .fg(theme.busy)
                .add_modifier(Modifier::ITALIC),
        )),
    });

    f.render_widget(Paragraph::new(lines), inner);

    // Only show the cursor when typing would land in the form.
    if let Some(row) = cursor_row {
        if app.dialog.is_none() && (row as u16) < inner.height {
            let len = display_value(app.field, state.fields.get(app.field))
                .chars()
                .count() as u16;
            let x = (inner.x + 2 + len).min(inner.right().saturating_sub(1));
            f.set_cursor_position((x, inner.y + row as u16));
        }
    }
}

// ── Saved cards ──────────────────────────────────────────────────────────────

fn saved_card_lines<'a>(
    card: &'a SavedCard,
    selected: bool,
    deleting: bool,
    theme: &Theme,
) -> Vec<Line<'a>> {
    let marker_style = Style::default()
        .fg(theme.accent)
        .add_modifier(Modifier::BOLD);
    let label = Style::default().fg(theme.text_dim);
    let value = if selected {
        Style::default()
            .fg(theme.text)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text)
    };

    let mut number = vec![
        Span::styled(if selected { "> " } else { "  " }, marker_style),
        Span::styled("Number: ", label),
        Span::styled(card.masked_number(), value),
    ];
    if deleting {
        number.push(Span::styled(
            "  deleting...",
            Style::default()
                .fg(theme.busy)
                .add_modifier(Modifier::ITALIC),
        ));
    }

    vec![
        Line::from(number),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("Name: ", label),
            Span::styled(card.cardholder_name.as_str(), value),
        ]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("Expires: ", label),
            Span::styled(card.expiry_date.as_str(), value),
        ]),
        Line::from(""),
    ]
}

fn render_saved(f: &mut Frame, area: Rect, app: &App, state: &FormState) {
    let theme = &app.theme;
    let focused = app.focus == Focus::Saved;
    let title = if state.loading {
        " Saved cards (loading...) ".to_string()
    } else {
        format!(" Saved cards ({}) ", state.saved.len())
    };
    let block = panel(title, focused, theme);

    if state.saved.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            "  No saved cards",
            Style::default()
                .fg(theme.text_dim)
                .add_modifier(Modifier::ITALIC),
        )))
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let lines: Vec<Line> = state
        .saved
        .iter()
        .enumerate()
        .flat_map(|(i, card)| {
            let selected = focused && i == app.selected;
            let deleting = state.deleting.contains(&card.id);
            saved_card_lines(card, selected, deleting, theme)
        })
        .collect();

    let scroll = saved_scroll(app.selected, focused, area.height);

    f.render_widget(Paragraph::new(lines).scroll((scroll, 0)).block(block), area);
}

/// Rows to scroll the saved list by. Each card takes four rows; while the
/// list has focus the selected card is kept in view, otherwise it shows the top.
fn saved_scroll(selected: usize, focused: bool, height: u16) -> u16 {
    if !focused {
        return 0;
    }
    let visible = height.saturating_sub(2) as usize;
    let selected_bottom = (selected + 1) * 4;
    selected_bottom.saturating_sub(visible) as u16
}

// ── Footer ───────────────────────────────────────────────────────────────────

fn hint<'a>(key: &'a str, text: &'a str, theme: &Theme) -> [Span<'a>; 2] {
    [
        Span::styled(
            key,
            Style::default()
                .fg(theme.hint_key)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(text, Style::default().fg(theme.hint_text)),
    ]
}

fn render_footer(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;

    if let Some(banner) = &app.banner {
        let color = match banner.kind {
            BannerKind::Error => theme.error,
            BannerKind::Success => theme.success,
        };
        let line = Line::from(vec![
            Span::styled(
                format!(" {} ", banner.title),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
            Span::styled(banner.message.as_str(), Style::default().fg(theme.text)),
        ]);
        f.render_widget(Paragraph::new(line), area);
        return;
    }

    let mut spans = vec![Span::raw(" ")];
    let hints: &[(&str, &str)] = match app.focus {
        Focus::Form => &[
            ("Enter", " save  "),
            ("Up/Down", " field  "),
            ("Tab", " cards  "),
            ("Ctrl+X", " clear  "),
            ("Ctrl+R", " reload  "),
            ("Ctrl+T", " theme  "),
            ("Esc", " quit"),
        ],
        Focus::Saved => &[
            ("Enter/d", " delete  "),
            ("Up/Down", " select  "),
            ("Tab/Esc", " form  "),
            ("Ctrl+R", " reload  "),
            ("Ctrl+T", " theme"),
        ],
    };
    for &(key, text) in hints {
        spans.extend(hint(key, text, theme));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ── Confirm dialog ───────────────────────────────────────────────────────────

fn render_dialog(f: &mut Frame, app: &App) {
    let Some(dialog) = &app.dialog else {
        return;
    };
    let theme = &app.theme;
    let area = f.area();

    let w = 50u16.min(area.width);
    let h = 7u16.min(area.height);
    let rect = Rect::new(
        area.x + area.width.saturating_sub(w) / 2,
        area.y + area.height.saturating_sub(h) / 2,
        w,
        h,
    );

    f.render_widget(Clear, rect);
    let mut buttons = vec![Span::raw("  ")];
    buttons.extend(hint("y", " yes, delete it   ", theme));
    buttons.extend(hint("n", " cancel", theme));

    let body = Paragraph::new(vec![
        Line::from(Span::styled(
            dialog.message.as_str(),
            Style::default().fg(theme.text),
        )),
        Line::from(""),
        Line::from(buttons),
    ])
    .wrap(Wrap { trim: true })
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .style(Style::default().bg(theme.bg))
            .border_style(Style::default().fg(theme.border_focused))
            .title(format!(" {} ", dialog.title))
            .title_alignment(Alignment::Center)
            .title_style(
                Style::default()
                    .fg(theme.title)
                    .add_modifier(Modifier::BOLD),
            ),
    );
    f.render_widget(body, rect);
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use ratatui::{Terminal, backend::TestBackend};
    use tokio::sync::oneshot;

    use super::*;
    use crate::card::{FieldErrors, FormFields};
    use crate::notify::Notice;

    fn render(app: &App, state: &FormState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal.draw(|f| ui(f, app, state)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    fn saved(id: &str, number: &str) -> SavedCard {
        SavedCard {
            id: id.into(),
            card_number: number.into(),
            expiry_date: "12/25".into(),
            cardholder_name: "Jose Perez".into(),
        }
    }

    #[test]
    fn empty_form_shows_placeholders() {
        let screen = render(&App::new(), &FormState::default());
        assert!(screen.contains(HEADER));
        assert!(screen.contains(PREVIEW_NUMBER));
        assert!(screen.contains(PREVIEW_HOLDER));
        assert!(screen.contains("VALID THRU"));
        assert!(screen.contains("0000 0000 0000 0000"));
        assert!(screen.contains("MM/YY"));
        assert!(screen.contains("No saved cards"));
    }

    #[test]
    fn preview_follows_typed_values_and_cvv_is_masked() {
        let state = FormState {
            fields: FormFields {
                card_number: "4111 1111 1111 1111".into(),
                expiry_date: "12/25".into(),
                cardholder_name: "Jose Perez".into(),
                cvv: "987".into(),
            },
            ..FormState::default()
        };
        let screen = render(&App::new(), &state);
        assert!(screen.contains("4111 1111 1111 1111"));
        assert!(screen.contains("Jose Perez"));
        assert!(!screen.contains(PREVIEW_NUMBER));
        assert!(!screen.contains("987"));
        assert!(screen.contains("***"));
    }

    #[test]
    fn saved_cards_are_masked() {
        let state = FormState {
            saved: vec![saved("1", "4111111111111111"), saved("2", "12345")],
            ..FormState::default()
        };
        let screen = render(&App::new(), &state);
        assert!(screen.contains("4111********1111"));
        assert!(!screen.contains("4111111111111111"));
        // Not 16 digits: shown as stored.
        assert!(screen.contains("12345"));
        assert!(screen.contains("Saved cards (2)"));
    }

    #[test]
    fn field_errors_render_inline() {
        let mut errors = FieldErrors::new();
        errors.insert(Field::Cvv, "CVV must have 3 digits");
        let state = FormState {
            errors,
            ..FormState::default()
        };
        let screen = render(&App::new(), &state);
        assert!(screen.contains("CVV must have 3 digits"));
    }

    #[test]
    fn unfocused_saved_list_is_not_scrolled() {
        assert_eq!(saved_scroll(9, false, 20), 0);
        assert_eq!(saved_scroll(9, true, 20), 22);
        assert_eq!(saved_scroll(0, true, 20), 0);

        let state = FormState {
            saved: (0..10)
                .map(|i| saved(&i.to_string(), &format!("400000000000000{i}")))
                .collect(),
            ..FormState::default()
        };
        let mut app = App::new();
        app.selected = 9;
        let screen = render(&app, &state);
        assert!(screen.contains("4000********0000"));
    }

    #[test]
    fn busy_indicators() {
        let state = FormState {
            saved: vec![saved("1", "4111111111111111")],
            phase: Phase::Submitting,
            deleting: ["1".to_string()].into(),
            ..FormState::default()
        };
        let screen = render(&App::new(), &state);
        assert!(screen.contains("Saving..."));
        assert!(screen.contains("deleting..."));
    }

    #[test]
    fn dialog_and_banner_are_drawn() {
        let mut app = App::new();
        let (reply, _rx) = oneshot::channel();
        app.push_notice(
            Notice::Confirm {
                title: "Are you sure?".into(),
                message: "You won't be able to revert this action.".into(),
                reply,
            },
            Instant::now(),
        );
        app.push_notice(
            Notice::Error {
                title: "Oops...".into(),
                message: "There was an error deleting the card.".into(),
            },
            Instant::now(),
        );

        let screen = render(&app, &FormState::default());
        assert!(screen.contains("Are you sure?"));
        assert!(screen.contains("revert this action"));
        assert!(screen.contains("There was an error deleting the card."));
    }
}
