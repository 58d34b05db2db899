// 🖥️ Terminal dashboard - ranking table with bars + entity detail
//
// Keys: ←/→ year, s sector, l locale, Tab page, ↑/↓ select, Enter detail,
// q quit.

use crate::cache::MatchCache;
use crate::locale::{format_decimal, format_optional, Locale};
use crate::matcher::RecordMatcher;
use crate::observation::Dataset;
use crate::sector::Sector;
use crate::summary::{country_ranking, sector_breakdown, summarize, tooltip_lines, RankedEntity};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

const BAR_WIDTH: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Ranking,
    Detail,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Ranking => Page::Detail,
            Page::Detail => Page::Ranking,
        }
    }

    pub fn title(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (Page::Ranking, Locale::Es) => "Clasificación",
            (Page::Ranking, Locale::En) => "Ranking",
            (Page::Detail, Locale::Es) => "Detalle",
            (Page::Detail, Locale::En) => "Detail",
        }
    }
}

pub struct App {
    pub dataset: Dataset,
    pub matcher: RecordMatcher,
    pub cache: MatchCache,
    pub years: Vec<i32>,
    pub year: i32,
    pub sector: Sector,
    pub ranking: Vec<RankedEntity>,
    pub state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
}

impl App {
    pub fn new(dataset: Dataset, matcher: RecordMatcher, year: i32) -> Self {
        let years = dataset.years();
        let year = if years.contains(&year) {
            year
        } else {
            years.last().copied().unwrap_or(year)
        };

        let mut app = App {
            dataset,
            matcher,
            cache: MatchCache::new(),
            years,
            year,
            sector: Sector::Total,
            ranking: Vec::new(),
            state: TableState::default(),
            current_page: Page::Ranking,
            show_detail: false,
        };
        app.refresh();
        app
    }

    pub fn locale(&self) -> Locale {
        self.matcher.locale
    }

    /// Recompute the ranking, keeping the selected entity when possible
    pub fn refresh(&mut self) {
        let selected_key = self.selected().map(|r| r.key.clone());
        self.ranking = country_ranking(&self.matcher, &self.dataset.observations, self.year, self.sector);

        let index = selected_key
            .and_then(|key| self.ranking.iter().position(|r| r.key == key))
            .or(if self.ranking.is_empty() { None } else { Some(0) });
        self.state.select(index);
    }

    pub fn selected(&self) -> Option<&RankedEntity> {
        self.state.selected().and_then(|i| self.ranking.get(i))
    }

    pub fn next_year(&mut self) {
        if let Some(&year) = self.years.iter().find(|&&y| y > self.year) {
            self.year = year;
            self.refresh();
        }
    }

    pub fn previous_year(&mut self) {
        if let Some(&year) = self.years.iter().rev().find(|&&y| y < self.year) {
            self.year = year;
            self.refresh();
        }
    }

    pub fn cycle_sector(&mut self) {
        self.sector = self.sector.next();
        self.refresh();
    }

    pub fn toggle_locale(&mut self) {
        self.matcher.locale = self.matcher.locale.toggle();
        self.refresh();
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn next(&mut self) {
        let len = self.ranking.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.ranking.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    /// Selected entity's value for every year in the dataset
    pub fn history(&self) -> Vec<(i32, Option<f64>)> {
        let Some(selected) = self.selected() else {
            return Vec::new();
        };
        self.years
            .iter()
            .map(|&year| {
                let value = self
                    .cache
                    .find_value(&self.matcher, &self.dataset, &selected.key, year, self.sector);
                (year, value)
            })
            .collect()
    }
}

/// "██████" scaled against `max`
pub fn bar(value: f64, max: f64, width: usize) -> String {
    if !value.is_finite() || !max.is_finite() || max <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let filled = ((value / max) * width as f64).round().clamp(0.0, width as f64) as usize;
    "█".repeat(filled)
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => app.next_page(),
                KeyCode::Right => app.next_year(),
                KeyCode::Left => app.previous_year(),
                KeyCode::Char('s') => app.cycle_sector(),
                KeyCode::Char('l') => app.toggle_locale(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Home if !app.ranking.is_empty() => app.state.select(Some(0)),
                KeyCode::End if !app.ranking.is_empty() => {
                    app.state.select(Some(app.ranking.len() - 1))
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    if app.show_detail && app.current_page == Page::Ranking {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);

        render_ranking(f, content_chunks[0], app);
        render_detail_panel(f, content_chunks[1], app);
    } else {
        match app.current_page {
            Page::Ranking => render_ranking(f, chunks[1], app),
            Page::Detail => render_detail_panel(f, chunks[1], app),
        }
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let locale = app.locale();

    let mut spans = vec![];
    for (i, page) in [Page::Ranking, Page::Detail].iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }
        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(page.title(locale), style));
    }

    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(app.dataset.name.clone(), Style::default().fg(Color::White)));
    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("◀ {} ▶", app.year),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::raw("  "));
    spans.push(Span::styled(app.sector.name(locale), Style::default().fg(Color::Green)));
    spans.push(Span::raw("  "));
    spans.push(Span::styled(
        locale.code().to_uppercase(),
        Style::default().fg(Color::Magenta),
    ));

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn render_ranking(f: &mut Frame, area: Rect, app: &mut App) {
    let locale = app.locale();
    let headers = match locale {
        Locale::Es => ["#", "Entidad", "Valor", ""],
        Locale::En => ["#", "Entity", "Value", ""],
    };
    let header_cells = headers.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let max = app.ranking.iter().map(|r| r.value).fold(0.0_f64, f64::max);
    let rows = app.ranking.iter().map(|r| {
        let color = if r.key == crate::entities::region::CANARIAS_CODE || r.key == "ES" {
            Color::Yellow
        } else {
            Color::Cyan
        };
        Row::new(vec![
            Cell::from(format!("{}", r.position.rank)),
            Cell::from(truncate(&r.name, 28)),
            Cell::from(format_decimal(r.value, 2, locale)),
            Cell::from(bar(r.value, max, BAR_WIDTH)).style(Style::default().fg(color)),
        ])
        .height(1)
    });

    let title = format!(" {} {} ", app.current_page.title(locale), app.year);
    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(30),
            Constraint::Length(12),
            Constraint::Length(BAR_WIDTH as u16 + 2),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let locale = app.locale();
    let title = match locale {
        Locale::Es => " Detalle ",
        Locale::En => " Details ",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(title);

    let Some(key) = app.selected().map(|r| r.key.clone()) else {
        f.render_widget(Paragraph::new(locale.no_data()).block(block), area);
        return;
    };
    let summary = summarize(&app.matcher, &app.dataset.observations, &key, app.year, app.sector);
    let Some(summary) = summary else {
        f.render_widget(Paragraph::new(locale.no_data()).block(block), area);
        return;
    };

    let label = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let heading = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED);

    let mut content = vec![Line::from("")];
    for line in tooltip_lines(&summary, locale) {
        content.push(Line::from(format!("  {}", line)));
    }

    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        match locale {
            Locale::Es => "  SECTORES",
            Locale::En => "  SECTORS",
        },
        heading,
    )));
    let breakdown = sector_breakdown(&app.matcher, &app.dataset.observations, &key, app.year);
    for share in &breakdown.sectors {
        content.push(Line::from(vec![
            Span::styled(format!("  {}: ", share.sector.name(locale)), label),
            Span::raw(format_optional(share.value, 2, locale)),
            Span::raw(" ("),
            Span::raw(format_optional(share.share, 1, locale)),
            Span::raw(" %)"),
        ]));
    }

    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        match locale {
            Locale::Es => "  EVOLUCIÓN",
            Locale::En => "  HISTORY",
        },
        heading,
    )));
    let history = app.history();
    let max = history
        .iter()
        .filter_map(|(_, v)| *v)
        .fold(0.0_f64, f64::max);
    for (year, value) in history {
        content.push(Line::from(vec![
            Span::styled(format!("  {} ", year), label),
            Span::raw(format!("{:>8} ", format_optional(value, 2, locale))),
            Span::styled(
                value.map(|v| bar(v, max, 20)).unwrap_or_default(),
                Style::default().fg(Color::Green),
            ),
        ]));
    }

    f.render_widget(Paragraph::new(content).block(block), area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);
    let total = app.ranking.len();
    let key = Style::default().fg(Color::Yellow);

    let status_spans = vec![
        Span::styled(format!(" {}/{} ", selected, total), Style::default().fg(Color::Cyan)),
        Span::raw(" | "),
        Span::styled("←/→", key),
        Span::raw(" Year | "),
        Span::styled("s", key),
        Span::raw(" Sector | "),
        Span::styled("l", key),
        Span::raw(" Locale | "),
        Span::styled("Enter", key),
        Span::raw(" Details | "),
        Span::styled("Tab", key),
        Span::raw(" Page | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EntityCatalog;
    use crate::observation::Observation;
    use std::sync::Arc;

    fn app() -> App {
        let dataset = Dataset::new(
            "gdp.csv",
            vec![
                Observation::new("Spain", 2021, "All Sectors", "1,40"),
                Observation::new("Spain", 2022, "All Sectors", "1,44"),
                Observation::new("Germany", 2021, "All Sectors", "3,13"),
                Observation::new("Germany", 2022, "All Sectors", "3,13"),
                Observation::new("Portugal", 2022, "All Sectors", "1,73"),
                Observation::new("Spain", 2022, "Business enterprise sector", "0,81"),
            ],
        );
        let matcher = RecordMatcher::new(Arc::new(EntityCatalog::with_defaults()));
        App::new(dataset, matcher, 2022)
    }

    #[test]
    fn test_app_starts_on_requested_year() {
        let app = app();
        assert_eq!(app.year, 2022);
        assert_eq!(app.ranking.len(), 3);
        assert_eq!(app.selected().map(|r| r.key.as_str()), Some("DE"));
    }

    #[test]
    fn test_unknown_year_falls_back_to_latest() {
        let dataset = app().dataset;
        let matcher = RecordMatcher::new(Arc::new(EntityCatalog::with_defaults()));
        let app = App::new(dataset, matcher, 1999);
        assert_eq!(app.year, 2022);
    }

    #[test]
    fn test_year_navigation_keeps_selection() {
        let mut app = app();
        app.next(); // PT
        app.next(); // ES
        assert_eq!(app.selected().map(|r| r.key.as_str()), Some("ES"));

        app.previous_year();
        assert_eq!(app.year, 2021);
        assert_eq!(app.selected().map(|r| r.key.as_str()), Some("ES"));

        app.previous_year();
        assert_eq!(app.year, 2021);
    }

    #[test]
    fn test_sector_and_locale_cycle() {
        let mut app = app();
        app.cycle_sector();
        assert_eq!(app.sector, Sector::Business);
        assert_eq!(app.ranking.len(), 1);

        app.toggle_locale();
        assert_eq!(app.locale(), Locale::En);
        assert_eq!(app.ranking[0].name, "Spain");
    }

    #[test]
    fn test_selection_wraps() {
        let mut app = app();
        app.previous();
        assert_eq!(app.state.selected(), Some(2));
        app.next();
        assert_eq!(app.state.selected(), Some(0));
    }

    #[test]
    fn test_history_uses_cache() {
        let mut app = app();
        app.next();
        app.next(); // ES
        let history = app.history();
        assert_eq!(history, vec![(2021, Some(1.40)), (2022, Some(1.44))]);

        app.history();
        assert_eq!(app.cache.stats().hits, 2);
    }

    #[test]
    fn test_bar() {
        assert_eq!(bar(5.0, 10.0, 10).chars().count(), 5);
        assert_eq!(bar(10.0, 10.0, 10).chars().count(), 10);
        assert_eq!(bar(f64::NAN, 10.0, 10), "");
        assert_eq!(bar(1.0, 0.0, 10), "");
    }
}
