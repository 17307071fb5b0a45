use ratatui::{
    layout::Alignment,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};
use pastelcal::app::AppState;

pub fn render(f: &mut Frame, app: &AppState) {
    let theme = app.theme();
    let area = f.size();
    let help_width = 64.min(area.width);
    let help_height = 24.min(area.height);
    let x = (area.width.saturating_sub(help_width)) / 2;
    let y = (area.height.saturating_sub(help_height)) / 2;

    let help_area = ratatui::layout::Rect {
        x,
        y,
        width: help_width,
        height: help_height,
    };

    f.render_widget(Clear, help_area);

    let section = |title: &'static str| {
        Line::from(vec![Span::styled(title, Style::default().fg(theme.help_section))])
    };

    let help_text = vec![
        Line::from(vec![Span::styled("pastelcal Help", Style::default().fg(theme.help_title).add_modifier(Modifier::BOLD))]),
        Line::from(""),
        section("Navigation:"),
        Line::from("  h/l      - Previous/next day"),
        Line::from("  j/k      - Next/previous week"),
        Line::from("  J/K      - Select next/previous event"),
        Line::from("  { / }    - Previous/next month"),
        Line::from("  t        - Jump to today"),
        Line::from(""),
        section("Events:"),
        Line::from("  a        - Add event on the selected day"),
        Line::from("  E/Enter  - Edit selected event"),
        Line::from("  x        - Delete selected event"),
        Line::from("  /        - Search titles and descriptions"),
        Line::from("  Esc      - Clear search and category filter"),
        Line::from(""),
        section("Calendars:"),
        Line::from("  c        - Show/hide current calendar"),
        Line::from("  C        - Switch current calendar"),
        Line::from("  D        - Toggle dark mode"),
        Line::from(""),
        section("Commands:"),
        Line::from("  :q             - Quit"),
        Line::from("  :w             - Sync with the server"),
        Line::from("  :goto DATE     - Jump to date (:goto 2025-12-25)"),
        Line::from("  :new [TEXT]    - New event (:new Gym tomorrow at 7am)"),
        Line::from("  :cal NAME [#hex] - Create calendar"),
        Line::from("  :use NAME      - Make calendar current"),
        Line::from("  :hide/:show NAME - Change calendar visibility"),
        Line::from("  :delcal NAME   - Delete calendar and its events"),
        Line::from("  :default NAME  - Make calendar the default"),
        Line::from("  :open NAME     - Show only that calendar"),
        Line::from("  :all           - Show every calendar"),
        Line::from("  :join NAME     - Join a community calendar"),
        Line::from("  :filter CAT    - Filter by category (or all)"),
        Line::from("  :search [TEXT] - Search, empty to clear"),
        Line::from("  :dark          - Toggle dark mode"),
        Line::from("  :help          - Show this help"),
        Line::from(""),
    ];

    let visible_lines = help_height.saturating_sub(3) as usize;
    let total_lines = help_text.len();
    let max_scroll = total_lines.saturating_sub(visible_lines);
    let scroll = app.help_scroll.min(max_scroll);

    let scrolled_text: Vec<Line> = help_text
        .into_iter()
        .skip(scroll)
        .take(visible_lines)
        .collect();

    let help_paragraph = Paragraph::new(scrolled_text)
        .block(Block::default()
            .borders(Borders::ALL)
            .title(format!(" Help (j/k to scroll, q to close) [{}/{}] ", scroll + 1, total_lines))
            .style(Style::default().bg(theme.background).fg(theme.foreground)))
        .alignment(Alignment::Left);

    f.render_widget(help_paragraph, help_area);
}
