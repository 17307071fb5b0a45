use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use chrono::{Datelike, Local, NaiveDate};
use pastelcal::{
    app::AppState,
    ui::month_view::{self, CellEntry, DayCell, Segment},
    ui::theme::{parse_hex_color, Theme},
};

pub fn render(f: &mut Frame, app: &AppState, area: Rect) {
    let theme = app.theme();
    let layout = month_view::calculate_layout(app, Local::now().date_naive());

    let month_name = NaiveDate::from_ymd_opt(layout.year, layout.month, 1)
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_else(|| format!("{}-{:02}", layout.year, layout.month));

    let block = Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {} ", month_name),
            Style::default().fg(theme.title).add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut row_constraints = vec![Constraint::Length(1)];
    row_constraints.extend((0..6).map(|_| Constraint::Ratio(1, 6)));
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(row_constraints)
        .split(inner);

    let header_cells = split_columns(rows[0]);
    for (label, cell_area) in app.week_start.header().iter().zip(header_cells.iter()) {
        let header = Paragraph::new(Span::styled(
            format!(" {}", label),
            Style::default().fg(theme.weekday_header).add_modifier(Modifier::BOLD),
        ));
        f.render_widget(header, *cell_area);
    }

    for (week, row_area) in layout.weeks().zip(rows.iter().skip(1)) {
        let columns = split_columns(*row_area);
        for (cell, cell_area) in week.iter().zip(columns.iter()) {
            render_cell(f, cell, *cell_area, &theme);
        }
    }
}

fn split_columns(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints((0..7).map(|_| Constraint::Ratio(1, 7)).collect::<Vec<_>>())
        .split(area)
        .to_vec()
}

fn render_cell(f: &mut Frame, cell: &DayCell<'_>, area: Rect, theme: &Theme) {
    let width = area.width as usize;

    let mut day_style = Style::default().fg(theme.foreground);
    if !cell.is_current_month {
        day_style = day_style.fg(theme.inactive_day);
    }
    if cell.is_today {
        day_style = day_style.fg(theme.today).add_modifier(Modifier::BOLD);
    }
    if cell.is_selected {
        day_style = day_style
            .bg(theme.selected_bg)
            .fg(theme.selected_fg)
            .add_modifier(Modifier::BOLD);
    }

    let mut lines = vec![Line::from(Span::styled(format!(" {:>2}", cell.date.day()), day_style))];

    for entry in cell.visible_entries() {
        lines.push(entry_line(entry, width));
    }

    if cell.overflow() > 0 {
        lines.push(Line::from(Span::styled(
            format!(" +{} more", cell.overflow()),
            Style::default().fg(theme.inactive_day).add_modifier(Modifier::ITALIC),
        )));
    }

    f.render_widget(Paragraph::new(lines), area);
}

/// One bar per entry: the title on the first day, a continuation line with
/// corner glyphs on the rest.
fn entry_line<'a>(entry: &CellEntry<'a>, width: usize) -> Line<'a> {
    let event = entry.event;
    let style = Style::default().bg(parse_hex_color(&event.color)).fg(Color::Black);
    let fill = width.saturating_sub(1);

    let text = match entry.segment {
        Segment::Single => {
            let label = match &event.start_time {
                Some(start) if !event.is_all_day => format!("{} {}", start, event.title),
                _ => event.title.clone(),
            };
            fit(&label, fill)
        }
        Segment::Start => fit(&format!("┌{}", event.title), fill),
        Segment::Middle => "─".repeat(fill),
        Segment::End => format!("{}┘", "─".repeat(fill.saturating_sub(1))),
    };

    Line::from(vec![Span::raw(" "), Span::styled(text, style)])
}

fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count > width {
        let mut truncated: String = text.chars().take(width.saturating_sub(1)).collect();
        truncated.push('…');
        truncated
    } else {
        format!("{}{}", text, " ".repeat(width - count))
    }
}
