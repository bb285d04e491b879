use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::db::KeyValueStore;
use crate::models::{ApplicationRecord, Status, StatusFilter};
use crate::store::Store;
use crate::view::{self, StatusCounts};

struct AppState<B: KeyValueStore> {
    store: Store<B>,
    filter: StatusFilter,
    query: String,
    searching: bool,
    selected: usize,
    scroll_offset: u16,
}

impl<B: KeyValueStore> AppState<B> {
    fn new(store: Store<B>, filter: StatusFilter, query: String) -> Self {
        Self {
            store,
            filter,
            query,
            searching: false,
            selected: 0,
            scroll_offset: 0,
        }
    }

    fn visible(&self) -> Vec<&ApplicationRecord> {
        view::derive(self.store.records(), self.filter, &self.query).filtered
    }

    fn counts(&self) -> StatusCounts {
        view::derive(self.store.records(), self.filter, &self.query).counts
    }

    fn current(&self) -> Option<&ApplicationRecord> {
        self.visible().get(self.selected).copied()
    }

    fn current_id(&self) -> Option<String> {
        self.current().map(|r| r.id.clone())
    }

    /// Keep the selection inside the filtered view after it changes.
    fn clamp_selection(&mut self) {
        let len = self.visible().len();
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
    }

    fn next(&mut self) {
        let len = self.visible().len();
        if len > 0 && self.selected < len - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    fn cycle_filter(&mut self) {
        self.filter = self.filter.next();
        self.selected = 0;
        self.scroll_offset = 0;
    }

    fn push_query(&mut self, c: char) {
        self.query.push(c);
        self.selected = 0;
        self.scroll_offset = 0;
    }

    fn pop_query(&mut self) {
        self.query.pop();
        self.scroll_offset = 0;
        self.clamp_selection();
    }

    fn set_status(&mut self, status: Status) -> Result<()> {
        if let Some(id) = self.current_id() {
            self.store.set_status(&id, status)?;
            self.clamp_selection();
        }
        Ok(())
    }

    fn remove_current(&mut self) -> Result<()> {
        if let Some(id) = self.current_id() {
            self.store.remove(&id)?;
            self.scroll_offset = 0;
            self.clamp_selection();
        }
        Ok(())
    }
}

/// Runs `restore` when dropped, so every exit path after raw mode is
/// enabled puts the terminal back.
struct RestoreGuard<F: FnMut()> {
    restore: F,
}

impl<F: FnMut()> Drop for RestoreGuard<F> {
    fn drop(&mut self) {
        (self.restore)();
    }
}

fn restore_terminal() {
    if let Err(e) = disable_raw_mode() {
        tracing::warn!(error = %e, "failed to disable raw mode");
    }
    if let Err(e) = stdout().execute(LeaveAlternateScreen) {
        tracing::warn!(error = %e, "failed to leave alternate screen");
    }
}

pub fn run_browse<B: KeyValueStore>(store: Store<B>, filter: StatusFilter, query: String) -> Result<()> {
    let mut state = AppState::new(store, filter, query);

    enable_raw_mode()?;
    let _restore = RestoreGuard {
        restore: restore_terminal,
    };
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    run_loop(&mut terminal, &mut state)
}

fn run_loop<B: KeyValueStore>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState<B>,
) -> Result<()> {
    let mut list_state = ListState::default();

    loop {
        list_state.select(if state.visible().is_empty() {
            None
        } else {
            Some(state.selected)
        });
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if state.searching {
            match key.code {
                KeyCode::Enter | KeyCode::Esc => state.searching = false,
                KeyCode::Backspace => state.pop_query(),
                KeyCode::Char(c) => state.push_query(c),
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Down | KeyCode::Char('j') => state.next(),
            KeyCode::Up | KeyCode::Char('k') => state.prev(),
            KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
            KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
            KeyCode::Tab => state.cycle_filter(),
            KeyCode::Char('/') => state.searching = true,
            KeyCode::Char('a') => state.set_status(Status::Applied)?,
            KeyCode::Char('i') => state.set_status(Status::Interviewing)?,
            KeyCode::Char('o') => state.set_status(Status::Offer)?,
            KeyCode::Char('x') => state.set_status(Status::Rejected)?,
            KeyCode::Char('d') => state.remove_current()?,
            _ => {}
        }
    }
    Ok(())
}

fn status_style(status: Status) -> Style {
    match status {
        Status::Applied => Style::default().fg(Color::Cyan),
        Status::Interviewing => Style::default().fg(Color::Yellow),
        Status::Offer => Style::default().fg(Color::Green),
        Status::Rejected => Style::default().fg(Color::Red),
    }
}

fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Applied => "+",
        Status::Interviewing => "*",
        Status::Offer => "$",
        Status::Rejected => "x",
    }
}

fn counts_title<B: KeyValueStore>(state: &AppState<B>) -> String {
    let counts = state.counts();
    let mut parts = vec![format!("All {}", counts.all)];
    for status in Status::ALL {
        parts.push(format!("{} {}", status, counts.get(StatusFilter::Only(status))));
    }
    format!(" [{}] {} ", state.filter, parts.join(" | "))
}

fn draw<B: KeyValueStore>(frame: &mut Frame, state: &AppState<B>, list_state: &mut ListState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    // Search bar
    let search_title = if state.searching { " Search (Enter to finish) " } else { " Search " };
    let search = Paragraph::new(state.query.as_str())
        .block(Block::default().borders(Borders::ALL).title(search_title))
        .style(if state.searching {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        });
    frame.render_widget(search, rows[0]);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[1]);

    // Left panel: filtered applications
    let items: Vec<ListItem> = state
        .visible()
        .into_iter()
        .map(|r| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{} ", status_icon(r.status)), status_style(r.status)),
                Span::raw(format!("{} | {} ", r.company, r.role)),
                Span::styled(r.date.clone(), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(counts_title(state)))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: detail
    let detail_widget = Paragraph::new(build_detail(state.current()))
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    let help = Paragraph::new(
        " j/k:navigate  J/K:scroll  Tab:filter  /:search  a:applied i:interviewing o:offer x:rejected  d:delete  q:quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, rows[2]);
}

fn build_detail(record: Option<&ApplicationRecord>) -> Text<'_> {
    let Some(record) = record else {
        return Text::raw("No application selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(
        &record.role,
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!("at {}", record.company)));
    lines.push(Line::from(Span::styled(
        format!("Status: {}", record.status),
        status_style(record.status),
    )));
    lines.push(Line::from(format!("Applied on: {}", record.date)));
    if !record.link.is_empty() {
        lines.push(Line::from(format!("Link: {}", record.link)));
    }
    lines.push(Line::from(Span::styled(
        format!("ID: {}", record.id),
        Style::default().fg(Color::DarkGray),
    )));

    lines.push(Line::from(""));

    if record.notes.is_empty() {
        lines.push(Line::from(Span::styled(
            "(No notes)",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        lines.push(Line::from(Span::styled(
            "Notes",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(&record.notes, 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
    }

    Text::from(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::NewApplication;

    fn state_with(entries: &[(&str, &str)]) -> AppState<Database> {
        let mut store = Store::open(Database::open_in_memory().unwrap()).unwrap();
        for (company, role) in entries.iter().rev() {
            store
                .add(NewApplication {
                    company: company.to_string(),
                    role: role.to_string(),
                    ..Default::default()
                })
                .unwrap();
        }
        AppState::new(store, StatusFilter::All, String::new())
    }

    #[test]
    fn test_navigation_stays_in_bounds() {
        let mut state = state_with(&[("Acme", "SWE"), ("Globex", "SRE")]);
        state.prev();
        assert_eq!(state.selected, 0);
        state.next();
        state.next();
        assert_eq!(state.selected, 1);
        assert_eq!(state.current().unwrap().company, "Globex");
    }

    #[test]
    fn test_status_change_hides_record_under_filter() {
        let mut state = state_with(&[("Acme", "SWE"), ("Globex", "SRE")]);
        state.cycle_filter();
        assert_eq!(state.filter, StatusFilter::Only(Status::Applied));
        state.next();

        state.set_status(Status::Offer).unwrap();

        assert_eq!(state.visible().len(), 1);
        assert_eq!(state.selected, 0);
        assert_eq!(state.current().unwrap().company, "Acme");
        assert_eq!(state.counts().offer, 1);
    }

    #[test]
    fn test_search_editing_filters_and_resets_selection() {
        let mut state = state_with(&[("Acme", "SWE"), ("Globex", "SRE"), ("Globex", "PM")]);
        state.next();
        state.next();
        for c in "glob".chars() {
            state.push_query(c);
        }
        assert_eq!(state.selected, 0);
        assert_eq!(state.visible().len(), 2);

        for _ in 0..4 {
            state.pop_query();
        }
        assert_eq!(state.visible().len(), 3);
    }

    #[test]
    fn test_search_editing_resets_detail_scroll() {
        let mut state = state_with(&[("Acme", "SWE"), ("Globex", "SRE")]);
        state.scroll_down();
        state.push_query('g');
        assert_eq!(state.scroll_offset, 0);

        state.scroll_down();
        state.pop_query();
        assert_eq!(state.scroll_offset, 0);
    }

    #[test]
    fn test_remove_current_clamps_selection() {
        let mut state = state_with(&[("Acme", "SWE"), ("Globex", "SRE")]);
        state.next();
        state.remove_current().unwrap();
        assert_eq!(state.selected, 0);
        assert_eq!(state.current().unwrap().company, "Acme");

        state.remove_current().unwrap();
        assert!(state.current().is_none());
        state.remove_current().unwrap();
    }

    #[test]
    fn test_restore_guard_runs_on_early_error() {
        use std::cell::Cell;

        let restored = Cell::new(0);
        let setup = || -> Result<()> {
            let _restore = RestoreGuard {
                restore: || restored.set(restored.get() + 1),
            };
            anyhow::bail!("alternate screen unavailable");
        };

        assert!(setup().is_err());
        assert_eq!(restored.get(), 1);
    }

    #[test]
    fn test_counts_title_lists_every_status() {
        let state = state_with(&[("Acme", "SWE")]);
        let title = counts_title(&state);
        assert!(title.contains("[All]"));
        assert!(title.contains("All 1"));
        assert!(title.contains("Applied 1"));
        assert!(title.contains("Rejected 0"));
    }

    #[test]
    fn test_detail_for_empty_selection() {
        let text = build_detail(None);
        assert_eq!(text.lines.len(), 1);
    }
}
