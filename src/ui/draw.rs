use anyhow::Result;
use ratatui::backend::Backend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::line::NORMAL as LINE;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState,
};
use ratatui::{Frame, Terminal};
use ratatui_image::{Resize, StatefulImage};

use crate::assets;
use crate::config::RgbColor;
use crate::pipeline::{DetailState, StatusLevel};

use super::app::App;
use super::panes::Pane;

const HELP_MODAL_FOOTER: &str = "j/k: scroll  Esc/q: close";
const ORDINAL_WIDTH: u16 = 4;
const ICON_WIDTH: u16 = 4;
const STAT_WIDTH: u16 = 8;

pub fn render<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    terminal.draw(|frame| draw_frame(frame, app))?;
    Ok(())
}

fn draw_frame(frame: &mut Frame<'_>, app: &mut App) {
    let size = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    draw_header(frame, layout[0], app);
    draw_body(frame, layout[1], app);
    draw_footer(frame, layout[2], app);
    draw_help_modal(frame, size, app);
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let style = header_text_style(app);
    let browser = &app.browser;
    let spans = vec![
        Span::styled("DEXVIEW", style.add_modifier(Modifier::BOLD)),
        Span::raw("   "),
        Span::styled(
            format!(
                "{} POKEDEXES | {} POKEMON",
                browser.groups().len(),
                browser.members().len()
            ),
            style,
        ),
    ];
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_body(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let pane = app.ui_pane().clone();
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(pane.groups_width),
            Constraint::Length(pane.members_width),
            Constraint::Min(0),
        ])
        .split(area);

    draw_groups(frame, columns[0], app);
    draw_members(frame, columns[1], app);

    let detail = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(pane.sprite_height), Constraint::Min(0)])
        .split(columns[2]);
    draw_sprite(frame, detail[0], app);
    draw_stats(frame, detail[1], app);
}

fn draw_groups(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let active = app.focused_pane == Pane::Groups;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app, active));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(inner);

    let title = Line::from(Span::styled(Pane::Groups.title(), header_text_style(app)));
    render_header_with_separator(frame, layout[0], title, app, None, area.width);

    let groups = app.browser.groups();
    if groups.is_empty() {
        render_centered_words(frame, layout[1], "NO POKEDEXES");
        return;
    }

    let items: Vec<ListItem> = groups
        .iter()
        .enumerate()
        .map(|(index, group)| {
            let item = ListItem::new(Line::from(group.name.clone()));
            if app.browser.is_group_selected(index) {
                item.style(selection_style(app))
            } else {
                item
            }
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(app.group_cursor));

    let marker = if active { "> " } else { "  " };
    let list = List::new(items)
        .highlight_symbol(marker)
        .highlight_spacing(ratatui::widgets::HighlightSpacing::Always);

    frame.render_stateful_widget(list, layout[1], &mut state);
}

fn draw_members(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let active = app.focused_pane == Pane::Members;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app, active));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(inner);

    let header = Line::from(Span::styled(
        format!(
            "{:>width$}  POKEMON NAME",
            "#",
            width = ORDINAL_WIDTH as usize
        ),
        header_text_style(app),
    ));
    render_header_with_separator(frame, layout[0], header, app, None, area.width);
    app.member_page = layout[1].height as usize;

    let browser = &app.browser;
    if browser.members().is_empty() {
        let message = if browser.group_selection().is_empty() {
            "NO POKEDEX SELECTED"
        } else {
            "LOADING"
        };
        render_centered_words(frame, layout[1], message);
        return;
    }

    let rows: Vec<Row> = browser
        .members()
        .iter()
        .map(|member| {
            Row::new(vec![
                Cell::from(format!(
                    "{:>width$}",
                    member.ordinal,
                    width = ORDINAL_WIDTH as usize
                )),
                Cell::from(member.name.clone()),
            ])
        })
        .collect();

    let mut state = TableState::default();
    state.select(browser.member_selection());

    let table = Table::new(rows, [Constraint::Length(ORDINAL_WIDTH), Constraint::Min(0)])
        .column_spacing(2)
        .highlight_style(selection_style(app));

    frame.render_stateful_widget(table, layout[1], &mut state);
}

fn draw_sprite(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app, false))
        .title(Span::styled(" SPRITE ", header_text_style(app)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    frame.render_widget(Clear, inner);

    let render_area = image_render_area(app, inner);

    if let Some(state) = app.sprite_state() {
        let widget = StatefulImage::new(None).resize(Resize::Fit);
        frame.render_stateful_widget(widget, render_area, state);
        return;
    }

    let detail = app.browser.detail();
    let message = match (&detail.sprite_message, detail.state) {
        (Some(message), _) => message.to_uppercase(),
        (None, DetailState::Loading) => "LOADING".to_string(),
        (None, _) => "SELECT A POKEMON".to_string(),
    };
    render_centered_words(frame, inner, &message);
}

fn image_render_area(app: &App, area: Rect) -> Rect {
    if area.width == 0 || area.height == 0 {
        return area;
    }

    let Some(sprite) = app.browser.detail().sprite.as_ref() else {
        return area;
    };

    let (font_w, font_h) = app.image_font_size();
    if font_w == 0 || font_h == 0 {
        return area;
    }

    let desired_width = div_ceil_u32(sprite.width(), u32::from(font_w));
    let desired_height = div_ceil_u32(sprite.height(), u32::from(font_h));

    if desired_width == 0 || desired_height == 0 {
        return area;
    }

    let desired_width = desired_width.min(u32::from(u16::MAX)) as u16;
    let desired_height = desired_height.min(u32::from(u16::MAX)) as u16;

    let target_width = desired_width.min(area.width);
    let target_height = desired_height.min(area.height);

    let wratio = target_width as f64 / desired_width as f64;
    let hratio = target_height as f64 / desired_height as f64;
    let mut ratio = wratio.min(hratio);
    if !ratio.is_finite() || ratio <= 0.0 {
        ratio = 1.0;
    }

    let width = (desired_width as f64 * ratio)
        .round()
        .clamp(1.0, area.width as f64) as u16;
    let height = (desired_height as f64 * ratio)
        .round()
        .clamp(1.0, area.height as f64) as u16;

    let offset_x = area.width.saturating_sub(width) / 2;
    let offset_y = area.height.saturating_sub(height) / 2;

    Rect {
        x: area.x.saturating_add(offset_x),
        y: area.y.saturating_add(offset_y),
        width: width.max(1),
        height: height.max(1),
    }
}

fn div_ceil_u32(value: u32, divisor: u32) -> u32 {
    if divisor == 0 {
        return 0;
    }
    value / divisor + u32::from(value % divisor != 0)
}

fn draw_stats(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let detail = app.browser.detail();
    let title = match (&detail.member, detail.state) {
        (Some(member), DetailState::Loading) => format!(" {} ... ", member.name.to_uppercase()),
        (Some(member), _) => format!(" {} ", member.name.to_uppercase()),
        (None, _) => " STATS ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app, false))
        .title(Span::styled(title, header_text_style(app)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(0)])
        .split(inner);

    let header = Line::from(Span::styled(
        format!(
            "{:<icon$} {:<label$} STAT",
            "ICON",
            "STAT NAME",
            icon = ICON_WIDTH as usize,
            label = inner.width.saturating_sub(ICON_WIDTH + STAT_WIDTH + 2) as usize
        ),
        header_text_style(app),
    ));
    render_header_with_separator(frame, layout[0], header, app, None, area.width);

    if detail.rows.is_empty() {
        let message = match detail.state {
            DetailState::Loading => "LOADING",
            _ => "NO DATA",
        };
        render_centered_words(frame, layout[1], message);
        return;
    }

    let rows: Vec<Row> = detail
        .rows
        .iter()
        .map(|row| {
            let swatch = row
                .icon
                .as_ref()
                .and_then(assets::dominant_rgb)
                .map(|(r, g, b)| Cell::from("  ").style(Style::default().bg(Color::Rgb(r, g, b))))
                .unwrap_or_else(|| Cell::from(""));
            Row::new(vec![
                swatch,
                Cell::from(row.label.clone()),
                Cell::from(row.value.clone()),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(ICON_WIDTH),
            Constraint::Min(0),
            Constraint::Length(STAT_WIDTH),
        ],
    )
    .column_spacing(1);

    frame.render_widget(table, layout[1]);
}

fn draw_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let colors = app.ui_colors();
    let base = Style::default()
        .fg(color(colors.status_fg))
        .bg(color(colors.status_bg));

    let background = Block::default().style(Style::default().bg(color(colors.status_bg)));
    frame.render_widget(background, area);

    let (status, status_style) = match app.browser.status() {
        Some(status) if status.level == StatusLevel::Error => {
            (status.message.as_str(), base.fg(color(colors.error_fg)))
        }
        Some(status) => (status.message.as_str(), base),
        None => ("READY", base),
    };

    let status_width = (status.chars().count() as u16).min(area.width / 2);
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(status_width)])
        .split(area);

    frame.render_widget(
        Paragraph::new(app.browser.selection_text().to_string()).style(base),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(status.to_string())
            .style(status_style)
            .alignment(Alignment::Right),
        chunks[1],
    );
}

fn draw_help_modal(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    if app.help_modal.is_none() {
        return;
    }

    let width = area.width.saturating_mul(2).saturating_div(3).max(40).min(area.width);
    let height = area.height.saturating_mul(4).saturating_div(5).max(10).min(area.height);

    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let modal_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, modal_area);

    let header_style = header_text_style(app);
    let border_s = border_style(app, true);

    let sections = app.help_entries();
    let mut lines: Vec<Line> = Vec::new();

    let content_width = width.saturating_sub(4) as usize;
    let action_width = 20usize;

    for (section_idx, section) in sections.iter().enumerate() {
        let header_text = format!(" {} ", section.title);
        let padding_total = content_width.saturating_sub(header_text.len());
        let left_pad = padding_total / 2;
        let right_pad = padding_total - left_pad;
        let header_line = format!(
            "{}{}{}",
            LINE.horizontal.repeat(left_pad),
            header_text,
            LINE.horizontal.repeat(right_pad)
        );
        lines.push(Line::from(Span::styled(header_line, header_style)));

        for entry in &section.entries {
            let action = format!("{:<width$}", entry.action, width = action_width);
            lines.push(Line::from(vec![
                Span::styled(action, Style::default()),
                Span::styled(entry.keys.clone(), header_style),
            ]));
        }

        if section_idx + 1 < sections.len() {
            lines.push(Line::from(""));
        }
    }

    let total_lines = lines.len();
    // borders (2) + footer line (1)
    let inner_height = height.saturating_sub(3) as usize;

    let Some(modal) = app.help_modal.as_mut() else {
        return;
    };
    modal.total_lines = total_lines;
    modal.viewport_height = inner_height;

    let max_scroll = modal.total_lines.saturating_sub(modal.viewport_height);
    if modal.scroll > max_scroll {
        modal.scroll = max_scroll;
    }

    let scroll_indicator = match (modal.can_scroll_up(), modal.can_scroll_down()) {
        (true, true) => "▲▼",
        (true, false) => "▲ ",
        (false, true) => " ▼",
        (false, false) => "  ",
    };

    let visible_lines: Vec<Line> = lines
        .into_iter()
        .skip(modal.scroll)
        .take(modal.viewport_height)
        .collect();

    let title = Line::from(vec![
        Span::styled(" HELP ", header_style),
        Span::styled(scroll_indicator, header_style),
    ]);
    let footer = Line::from(Span::styled(
        format!(" {} ", HELP_MODAL_FOOTER),
        header_style,
    ));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_s)
        .title(title)
        .title_bottom(footer)
        .title_alignment(Alignment::Center);

    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);
    frame.render_widget(Paragraph::new(visible_lines), inner);
}

fn selection_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default()
        .fg(color(colors.selection_fg))
        .bg(color(colors.selection_bg))
}

fn border_style(app: &App, active: bool) -> Style {
    let colors = app.ui_colors();
    let style = Style::default().fg(color(colors.border));
    if active {
        style.add_modifier(Modifier::BOLD)
    } else {
        style
    }
}

fn header_text_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.separator))
}

fn separator_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.separator))
}

fn render_centered_words(frame: &mut Frame<'_>, area: Rect, text: &str) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    let mut lines: Vec<Line> = text
        .split_whitespace()
        .map(|word| Line::from(word.to_string()))
        .collect();

    if lines.is_empty() {
        return;
    }

    if lines.len() as u16 > area.height {
        lines.truncate(area.height as usize);
    }

    let height = lines.len() as u16;
    let start_y = area.y + (area.height.saturating_sub(height)) / 2;
    let target = Rect {
        x: area.x,
        y: start_y,
        width: area.width,
        height,
    };

    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), target);
}

/// Render a header line with a `├───┤` separator below it.
/// `outer_width` is the full pane width (including borders) so the separator joins them.
fn render_header_with_separator(
    frame: &mut Frame<'_>,
    area: Rect,
    content: Line<'static>,
    app: &App,
    style: Option<Style>,
    outer_width: u16,
) {
    if area.width == 0 || area.height == 0 {
        return;
    }

    let paragraph = match style {
        Some(style) => Paragraph::new(content).style(style),
        None => Paragraph::new(content),
    };

    if area.height == 1 {
        frame.render_widget(paragraph, area);
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    frame.render_widget(paragraph, layout[0]);

    let inner_width = outer_width.saturating_sub(2) as usize;
    let separator = format!(
        "{}{}{}",
        LINE.vertical_right,
        LINE.horizontal.repeat(inner_width),
        LINE.vertical_left
    );
    let separator_line = Line::from(Span::styled(separator, separator_style(app)));

    // Shifted left by one so it starts on the border
    let separator_area = Rect {
        x: layout[1].x.saturating_sub(1),
        y: layout[1].y,
        width: outer_width,
        height: 1,
    };
    frame.render_widget(Paragraph::new(separator_line), separator_area);
}

fn color(rgb: RgbColor) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}
