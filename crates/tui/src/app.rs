use std::{cmp, collections::BTreeSet, io, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use nordtrain_core::{
    export,
    favorites::{station_slug, FavoriteStation},
    models::{display, Country, Train},
    AppConfig, EditableField, FavoriteStore, FilterParams, TrainField, TrainStore,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::input::TextInput;

const TICK_RATE: Duration = Duration::from_millis(250);
const HISTORY_LIMIT: usize = 8;

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Browse,
    Search,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchStage {
    Field,
    Value,
}

#[derive(Debug, Clone)]
struct BatchPrompt {
    targets: Vec<String>,
    field_cursor: usize,
    stage: BatchStage,
    input: TextInput,
}

impl BatchPrompt {
    fn new(targets: Vec<String>) -> Self {
        Self {
            targets,
            field_cursor: 0,
            stage: BatchStage::Field,
            input: TextInput::default(),
        }
    }

    fn field(&self) -> EditableField {
        EditableField::ALL[self.field_cursor]
    }

    fn move_field(&mut self, delta: isize) {
        let len = EditableField::ALL.len() as isize;
        self.field_cursor = (self.field_cursor as isize + delta).rem_euclid(len) as usize;
    }
}

enum AppEvent {
    Input(Event),
    Tick,
}

/// Interactive train board.
pub struct DashboardApp {
    store: TrainStore,
    favorites: FavoriteStore,
    config: AppConfig,
    state: UiState,
    batch_prompt: Option<BatchPrompt>,
    theme: Theme,
}

impl DashboardApp {
    pub fn new(store: TrainStore, favorites: FavoriteStore, config: AppConfig) -> Self {
        let mut state = UiState::default();
        state.params.fuzzy_threshold = config.fuzzy_threshold;
        state.countries = store.countries();
        state.stations = store.stations();
        Self {
            store,
            favorites,
            config,
            state,
            batch_prompt: None,
            theme: Theme::default(),
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        self.refresh_rows();
        let stats = self.store.stats();
        self.state.set_status(format!(
            "Loaded {} trains ({} pending, {} with proposed changes)",
            stats.total, stats.pending, stats.with_changes
        ));
        info!(total = stats.total, "Dashboard started");

        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.hide_cursor()?;
        terminal.clear()?;

        let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(128);
        spawn_input_thread(event_tx);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }

            match event_rx.recv().await {
                Some(AppEvent::Input(event)) => {
                    if let Err(err) = self.handle_input(event) {
                        error!(?err, "Input handling failed");
                        self.state.set_status(format!("Error: {err}"));
                    }
                }
                Some(AppEvent::Tick) => {}
                None => break,
            }
        }

        restore_terminal(&mut terminal)?;
        Ok(())
    }

    fn refresh_rows(&mut self) {
        self.state.rows = self.store.query(&self.state.params);
        self.state.clamp_cursor();
        self.state.ensure_cursor_visible();
    }

    fn handle_input(&mut self, event: Event) -> Result<()> {
        let Event::Key(key) = event else {
            return Ok(());
        };
        if self.batch_prompt.is_some() {
            return self.handle_batch_key(key);
        }
        match self.state.mode {
            Mode::Search => self.handle_search_key(key),
            Mode::Browse => self.handle_browse_key(key),
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => {
                self.state.mode = Mode::Browse;
                self.state.search.clear();
                self.apply_search();
                self.state.set_status("Search cleared".to_string());
            }
            KeyCode::Enter => {
                self.state.mode = Mode::Browse;
                self.state.set_status(format!(
                    "{} match(es) for '{}'",
                    self.state.rows.len(),
                    self.state.search.value()
                ));
            }
            KeyCode::Backspace => {
                self.state.search.backspace();
                self.apply_search();
            }
            KeyCode::Delete => {
                self.state.search.delete();
                self.apply_search();
            }
            KeyCode::Left => self.state.search.move_cursor(-1),
            KeyCode::Right => self.state.search.move_cursor(1),
            KeyCode::Home => self.state.search.move_home(),
            KeyCode::End => self.state.search.move_end(),
            KeyCode::Char(c) => {
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                    self.state.search.insert(c);
                    self.apply_search();
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn apply_search(&mut self) {
        self.state.params.search_term = self.state.search.value().to_string();
        self.state.cursor = 0;
        self.state.offset = 0;
        self.refresh_rows();
    }

    fn handle_browse_key(&mut self, key: KeyEvent) -> Result<()> {
        let plain = key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT;
        if !plain {
            if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                self.state.should_quit = true;
            }
            return Ok(());
        }

        match key.code {
            KeyCode::Char('q') => self.state.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.state.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_cursor(-1),
            KeyCode::Char('g') | KeyCode::Home => self.state.move_to(0),
            KeyCode::Char('G') | KeyCode::End => self.state.move_to_end(),
            KeyCode::PageDown => self.state.page_down(),
            KeyCode::PageUp => self.state.page_up(),
            KeyCode::Char('/') => {
                self.state.mode = Mode::Search;
                self.state.search = TextInput::with_value(&self.state.params.search_term);
                self.state.set_status("Type to search".to_string());
            }
            KeyCode::Char('e') => {
                self.state.params.exact_match = !self.state.params.exact_match;
                self.refresh_rows();
                let mode = if self.state.params.exact_match {
                    "exact"
                } else {
                    "fuzzy"
                };
                self.state.set_status(format!("Search mode: {mode}"));
            }
            KeyCode::Char('s') => {
                self.state.params.status = self.state.params.status.next();
                self.refresh_rows();
                self.state
                    .set_status(format!("Status filter: {}", self.state.params.status));
            }
            KeyCode::Char('c') => {
                self.state.params.country =
                    cycle_option(&self.state.countries, &self.state.params.country);
                self.refresh_rows();
                self.state.set_status(format!(
                    "Country: {}",
                    self.state
                        .params
                        .country
                        .map(|country| country.name().to_string())
                        .unwrap_or_else(|| "all".to_string())
                ));
            }
            KeyCode::Char('t') => {
                self.state.params.station =
                    cycle_option(&self.state.stations, &self.state.params.station);
                self.refresh_rows();
                self.announce_station();
            }
            KeyCode::Char('F') => {
                let names: Vec<String> = self
                    .favorites
                    .stations()
                    .iter()
                    .map(|station| station.name.clone())
                    .collect();
                if names.is_empty() {
                    self.state
                        .set_status("No favorite stations yet (press f on a row)".to_string());
                } else {
                    self.state.params.station = cycle_option(&names, &self.state.params.station);
                    self.refresh_rows();
                    self.announce_station();
                }
            }
            KeyCode::Char('o') => {
                self.state.params.sort_field =
                    cycle_option(&TrainField::SORTABLE, &self.state.params.sort_field);
                self.refresh_rows();
                self.announce_sort();
            }
            KeyCode::Char('O') => {
                self.state.params.sort_direction = self.state.params.sort_direction.flip();
                self.refresh_rows();
                self.announce_sort();
            }
            KeyCode::Char('x') => {
                let threshold = self.state.params.fuzzy_threshold;
                self.state.params = FilterParams::default().with_threshold(threshold);
                self.state.search.clear();
                self.refresh_rows();
                self.state.set_status("Filters reset".to_string());
            }
            KeyCode::Char(' ') => {
                if let Some(id) = self.state.current_train().map(|train| train.id.clone()) {
                    if !self.state.selection.remove(&id) {
                        self.state.selection.insert(id);
                    }
                    self.state.move_cursor(1);
                }
            }
            KeyCode::Char('a') => {
                let ids: Vec<String> = self.state.rows.iter().map(|t| t.id.clone()).collect();
                self.state.selection.extend(ids);
                self.state
                    .set_status(format!("{} selected", self.state.selection.len()));
            }
            KeyCode::Char('A') => {
                self.state.selection.clear();
                self.state.set_status("Selection cleared".to_string());
            }
            KeyCode::Char('b') => self.open_batch_prompt(),
            KeyCode::Char('d') => self.toggle_completed()?,
            KeyCode::Char('f') => self.toggle_favorite()?,
            KeyCode::Char('w') => self.export_selection()?,
            _ => {}
        }
        Ok(())
    }

    fn announce_station(&mut self) {
        let label = self
            .state
            .params
            .station
            .clone()
            .unwrap_or_else(|| "all".to_string());
        self.state.set_status(format!("Station: {label}"));
    }

    fn announce_sort(&mut self) {
        let message = match self.state.params.sort_field {
            Some(field) => format!(
                "Sorted by {} {}",
                field.label(),
                self.state.params.sort_direction.arrow()
            ),
            None => "Collection order".to_string(),
        };
        self.state.set_status(message);
    }

    /// Ids a bulk action applies to: the selection, or the row under the cursor.
    fn action_targets(&self) -> Vec<String> {
        if self.state.selection.is_empty() {
            self.state
                .current_train()
                .map(|train| vec![train.id.clone()])
                .unwrap_or_default()
        } else {
            self.state.selection.iter().cloned().collect()
        }
    }

    fn open_batch_prompt(&mut self) {
        let targets = self.action_targets();
        if targets.is_empty() {
            self.state.set_status("Nothing to edit".to_string());
            return;
        }
        self.batch_prompt = Some(BatchPrompt::new(targets));
    }

    fn handle_batch_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(mut prompt) = self.batch_prompt.take() else {
            return Ok(());
        };

        match prompt.stage {
            BatchStage::Field => match key.code {
                KeyCode::Esc => {
                    self.state.set_status("Batch edit cancelled".to_string());
                    return Ok(());
                }
                KeyCode::Up | KeyCode::Char('k') => prompt.move_field(-1),
                KeyCode::Down | KeyCode::Char('j') => prompt.move_field(1),
                KeyCode::Enter => prompt.stage = BatchStage::Value,
                _ => {}
            },
            BatchStage::Value => match key.code {
                KeyCode::Esc => {
                    prompt.stage = BatchStage::Field;
                    prompt.input.clear();
                }
                KeyCode::Enter => {
                    let field = prompt.field();
                    let value = prompt.input.value().to_string();
                    if let Err(err) = field.validate(&value) {
                        self.state.set_status(err.to_string());
                        self.batch_prompt = Some(prompt);
                        return Ok(());
                    }
                    self.apply_batch(&prompt.targets, field, &value);
                    return Ok(());
                }
                KeyCode::Backspace => prompt.input.backspace(),
                KeyCode::Delete => prompt.input.delete(),
                KeyCode::Left => prompt.input.move_cursor(-1),
                KeyCode::Right => prompt.input.move_cursor(1),
                KeyCode::Home => prompt.input.move_home(),
                KeyCode::End => prompt.input.move_end(),
                KeyCode::Char(c) => {
                    if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                        prompt.input.insert(c);
                    }
                }
                _ => {}
            },
        }

        self.batch_prompt = Some(prompt);
        Ok(())
    }

    fn apply_batch(&mut self, targets: &[String], field: EditableField, value: &str) {
        let report = self.store.batch_update(targets, field, value);
        let mut message = report.summary();
        if let Some((id, err)) = report.failures().next() {
            message.push_str(&format!(" (first failure {id}: {err})"));
        }
        self.state.set_status(message);
        self.state.stations = self.store.stations();
        self.refresh_rows();
    }

    fn toggle_completed(&mut self) -> Result<()> {
        let Some(mut train) = self.state.current_train().cloned() else {
            return Ok(());
        };
        train.completed = !train.completed;
        let message = format!("{} marked {}", train.id, train.status_label().to_lowercase());
        self.store.update(train)?;
        self.refresh_rows();
        self.state.set_status(message);
        Ok(())
    }

    fn toggle_favorite(&mut self) -> Result<()> {
        let Some(train) = self.state.current_train().cloned() else {
            return Ok(());
        };
        let Some(name) = train.from else {
            self.state
                .set_status(format!("{} has no origin station", train.id));
            return Ok(());
        };
        let station = FavoriteStation::from_name(&name, train.country);
        let now_favorite = self.favorites.toggle(station)?;
        let verb = if now_favorite { "Added" } else { "Removed" };
        self.state
            .set_status(format!("{verb} {name} as favorite station"));
        Ok(())
    }

    fn export_selection(&mut self) -> Result<()> {
        let trains: Vec<Train> = if self.state.selection.is_empty() {
            self.state.rows.clone()
        } else {
            self.store
                .all()
                .into_iter()
                .filter(|train| self.state.selection.contains(&train.id))
                .collect()
        };
        if trains.is_empty() {
            self.state.set_status("Nothing to export".to_string());
            return Ok(());
        }
        let path = export::export_to_dir(&self.config.export_dir, &trains)?;
        self.state.set_status(format!(
            "Exported {} train(s) to {}",
            trains.len(),
            path.display()
        ));
        Ok(())
    }

    fn is_favorite_station(&self, station: Option<&str>, country: Country) -> bool {
        station
            .map(|name| self.favorites.is_favorite(&station_slug(name), country))
            .unwrap_or(false)
    }

    fn draw(&mut self, frame: &mut Frame) {
        let size = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(size);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(68), Constraint::Percentage(32)])
            .split(chunks[1]);

        self.render_header(frame, chunks[0]);
        self.render_table(frame, body[0]);
        self.render_detail(frame, body[1]);
        self.render_status(frame, chunks[2]);
        if let Some(prompt) = &self.batch_prompt {
            self.render_batch_prompt(frame, prompt);
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let stats = self.store.stats();
        let mode = if self.state.params.exact_match {
            "exact"
        } else {
            "fuzzy"
        };
        let line = Line::from(vec![
            Span::styled(
                "Nordic Train Board",
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(
                "  {} trains · {} pending · {} done · {} with changes",
                stats.total, stats.pending, stats.completed, stats.with_changes
            )),
            Span::styled(
                format!("  [{mode}] {}", self.state.params.summary()),
                Style::default().fg(self.theme.muted),
            ),
        ]);
        let paragraph = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(paragraph, area);
    }

    fn render_table(&mut self, frame: &mut Frame, area: Rect) {
        // border plus header row
        self.state.list_height = area.height.saturating_sub(3) as usize;
        self.state.clamp_cursor();
        self.state.ensure_cursor_visible();

        let height = self.state.list_height;
        let header = Row::new(
            [
                "", "", "ID", "Op", "Ctry", "From", "To", "Arr", "Trk", "Status", "Notes",
            ]
            .into_iter()
            .map(Cell::from),
        )
        .style(
            Style::default()
                .fg(self.theme.accent)
                .add_modifier(Modifier::BOLD),
        );

        let rows: Vec<Row> = self
            .state
            .visible_rows(height)
            .iter()
            .map(|train| self.train_row(train))
            .collect();

        let mut table_state = TableState::default();
        if !rows.is_empty() {
            let selected = self
                .state
                .cursor
                .saturating_sub(self.state.offset)
                .min(rows.len() - 1);
            table_state.select(Some(selected));
        }

        let widths = [
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(4),
            Constraint::Length(14),
            Constraint::Length(14),
            Constraint::Length(12),
            Constraint::Length(8),
            Constraint::Length(9),
            Constraint::Min(10),
        ];
        let title = format!(
            "Trains ({} shown, {} selected)",
            self.state.rows.len(),
            self.state.selection.len()
        );
        let table = Table::new(rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().bg(self.theme.selection_bg));
        frame.render_stateful_widget(table, area, &mut table_state);
    }

    fn train_row(&self, train: &Train) -> Row<'static> {
        let selected = self.state.selection.contains(&train.id);
        let favorite = self.is_favorite_station(train.from.as_deref(), train.country)
            || self.is_favorite_station(train.to.as_deref(), train.country);
        let status_style = if train.completed {
            Style::default().fg(self.theme.success)
        } else {
            Style::default().fg(self.theme.warning)
        };
        let mut row_style = Style::default().fg(self.theme.primary_fg);
        if train.highlighted {
            row_style = row_style.add_modifier(Modifier::BOLD);
        }

        Row::new(vec![
            Cell::from(if selected { "✔" } else { " " }),
            Cell::from(if favorite { "★" } else { " " }),
            Cell::from(train.id.clone()),
            self.proposed_cell(Some(&train.operator), train.new_operator.as_deref()),
            Cell::from(train.country.code()),
            Cell::from(display(&train.from).to_string()),
            Cell::from(display(&train.to).to_string()),
            self.proposed_cell(train.arrival_time.as_deref(), train.new_time.as_deref()),
            self.proposed_cell(train.track.as_deref(), train.new_track.as_deref()),
            Cell::from(Span::styled(train.status_label(), status_style)),
            self.proposed_cell(train.notes.as_deref(), train.new_notes.as_deref()),
        ])
        .style(row_style)
    }

    /// Current value, followed by the proposed one when a change is pending.
    fn proposed_cell(&self, current: Option<&str>, proposed: Option<&str>) -> Cell<'static> {
        let current = current.unwrap_or(nordtrain_core::models::MISSING).to_string();
        match proposed {
            Some(next) => Cell::from(Line::from(vec![
                Span::styled(current, Style::default().fg(self.theme.muted)),
                Span::styled(
                    format!("→{next}"),
                    Style::default()
                        .fg(self.theme.warning)
                        .add_modifier(Modifier::BOLD),
                ),
            ])),
            None => Cell::from(current),
        }
    }

    fn render_detail(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Details");
        let Some(train) = self.state.current_train() else {
            let empty = Paragraph::new("No trains match the current filters").block(block);
            frame.render_widget(empty, area);
            return;
        };

        let label = |name: &str| {
            Span::styled(
                format!("{name:<11}"),
                Style::default().fg(self.theme.muted),
            )
        };
        let mut lines = vec![
            Line::from(Span::styled(
                format!("{} · {}", train.id, train.operator),
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(vec![label("Route"), Span::raw(train.route_label())]),
            Line::from(vec![
                label("Country"),
                Span::raw(train.country.name().to_string()),
            ]),
            Line::from(vec![
                label("Arrival"),
                Span::raw(display(&train.arrival_time).to_string()),
            ]),
            Line::from(vec![label("Track"), Span::raw(display(&train.track).to_string())]),
            Line::from(vec![label("OTN"), Span::raw(display(&train.otn).to_string())]),
            Line::from(vec![
                label("Announced"),
                Span::raw(display(&train.announced_train_number).to_string()),
            ]),
            Line::from(vec![label("Notes"), Span::raw(display(&train.notes).to_string())]),
            Line::from(vec![
                label("Status"),
                Span::raw(train.status_label().to_string()),
            ]),
        ];

        let pending = train.pending_changes();
        if !pending.is_empty() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                "Proposed changes",
                Style::default()
                    .fg(self.theme.warning)
                    .add_modifier(Modifier::BOLD),
            )));
            for change in pending {
                lines.push(Line::from(format!(
                    "  {}: {} → {}",
                    change.field,
                    change.current.unwrap_or(nordtrain_core::models::MISSING),
                    change.proposed
                )));
            }
        }

        let history = self.store.history(&train.id);
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "History",
            Style::default()
                .fg(self.theme.accent)
                .add_modifier(Modifier::BOLD),
        )));
        if history.is_empty() {
            lines.push(Line::from(Span::styled(
                "  no edits this session",
                Style::default().fg(self.theme.muted),
            )));
        }
        for record in history.iter().take(HISTORY_LIMIT) {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {} ", record.at.with_timezone(&Local).format("%H:%M:%S")),
                    Style::default().fg(self.theme.muted),
                ),
                Span::raw(format!(
                    "{}: {} → {}",
                    record.field,
                    display(&record.old),
                    display(&record.new)
                )),
            ]));
        }

        let paragraph = Paragraph::new(lines)
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let primary = if self.state.mode == Mode::Search {
            Line::from(vec![
                Span::styled("Search: ", Style::default().fg(self.theme.accent)),
                Span::raw(self.state.search.value().to_string()),
            ])
        } else {
            Line::from(self.state.status.clone())
        };
        let help = Line::from(Span::styled(
            "/ search  e exact  s status  c country  t station  F favorites  o/O sort  x reset  \
             space select  a all  A none  b batch  d done  f fav  w export  q quit",
            Style::default().fg(self.theme.muted),
        ));
        let paragraph = Paragraph::new(vec![primary, help])
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);

        if self.state.mode == Mode::Search && self.batch_prompt.is_none() {
            let cursor_x = (area.x + 1 + 8 + self.state.search.cursor() as u16)
                .min(area.x + area.width.saturating_sub(2));
            frame.set_cursor(cursor_x, area.y + 1);
        }
    }

    fn render_batch_prompt(&self, frame: &mut Frame, prompt: &BatchPrompt) {
        let frame_area = frame.size();
        let width = cmp::max(cmp::min(56_u16, frame_area.width.saturating_sub(4)), 24);
        let height = (EditableField::ALL.len() as u16 + 6).min(frame_area.height);
        let area = centered_rect(width, height, frame_area);
        frame.render_widget(Clear, area);

        let title = format!("Batch edit - {} train(s)", prompt.targets.len());
        let mut lines: Vec<Line> = EditableField::ALL
            .iter()
            .enumerate()
            .map(|(idx, field)| {
                if idx == prompt.field_cursor {
                    Line::from(Span::styled(
                        format!("▶ {}", field.name()),
                        Style::default()
                            .fg(self.theme.accent)
                            .add_modifier(Modifier::BOLD),
                    ))
                } else {
                    Line::from(Span::styled(
                        format!("  {}", field.name()),
                        Style::default().fg(self.theme.primary_fg),
                    ))
                }
            })
            .collect();

        lines.push(Line::from(""));
        let input_style = match prompt.stage {
            BatchStage::Field => Style::default().fg(self.theme.muted),
            BatchStage::Value => Style::default().fg(self.theme.primary_fg),
        };
        lines.push(Line::from(vec![
            Span::styled("> ", Style::default().fg(self.theme.accent)),
            Span::styled(prompt.input.value().to_string(), input_style),
        ]));
        let helper = match prompt.stage {
            BatchStage::Field => "↑/↓ field  Enter choose  Esc cancel",
            BatchStage::Value => "Enter apply  Esc back  (empty clears)",
        };
        lines.push(Line::from(Span::styled(
            helper,
            Style::default().fg(self.theme.danger),
        )));

        let paragraph = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: false });
        frame.render_widget(paragraph, area);

        if prompt.stage == BatchStage::Value {
            let input_row = area.y + 1 + EditableField::ALL.len() as u16 + 1;
            let cursor_x = (area.x + 3 + prompt.input.cursor() as u16)
                .min(area.x + area.width.saturating_sub(2));
            frame.set_cursor(cursor_x, input_row.min(area.y + area.height.saturating_sub(2)));
        }
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

struct UiState {
    rows: Vec<Train>,
    params: FilterParams,
    selection: BTreeSet<String>,
    countries: Vec<Country>,
    stations: Vec<String>,
    cursor: usize,
    offset: usize,
    list_height: usize,
    search: TextInput,
    status: String,
    mode: Mode,
    should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            params: FilterParams::default(),
            selection: BTreeSet::new(),
            countries: Vec::new(),
            stations: Vec::new(),
            cursor: 0,
            offset: 0,
            list_height: 1,
            search: TextInput::default(),
            status: "Ready".to_string(),
            mode: Mode::Browse,
            should_quit: false,
        }
    }
}

impl UiState {
    fn move_cursor(&mut self, delta: isize) {
        if self.rows.is_empty() {
            return;
        }
        let len = self.rows.len() as isize;
        let idx = (self.cursor as isize + delta).clamp(0, len - 1);
        self.cursor = idx as usize;
        self.ensure_cursor_visible();
    }

    fn move_to(&mut self, index: usize) {
        if self.rows.is_empty() {
            return;
        }
        self.cursor = index.min(self.rows.len() - 1);
        self.ensure_cursor_visible();
    }

    fn move_to_end(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        self.cursor = self.rows.len() - 1;
        self.ensure_cursor_visible();
    }

    fn page_down(&mut self) {
        if self.rows.is_empty() || self.list_height == 0 {
            return;
        }
        let delta = self.list_height.min(self.rows.len());
        self.move_cursor(delta as isize);
    }

    fn page_up(&mut self) {
        if self.rows.is_empty() || self.list_height == 0 {
            return;
        }
        let delta = self.list_height.min(self.rows.len());
        self.move_cursor(-(delta as isize));
    }

    fn visible_rows(&self, height: usize) -> &[Train] {
        if self.rows.is_empty() {
            return &[];
        }
        let start = self.offset.min(self.rows.len());
        let end = (start + height).min(self.rows.len());
        &self.rows[start..end]
    }

    fn current_train(&self) -> Option<&Train> {
        self.rows.get(self.cursor)
    }

    fn set_status(&mut self, message: String) {
        self.status = message;
    }

    fn clamp_cursor(&mut self) {
        if self.rows.is_empty() {
            self.cursor = 0;
            self.offset = 0;
        } else if self.cursor >= self.rows.len() {
            self.cursor = self.rows.len() - 1;
        }
    }

    fn ensure_cursor_visible(&mut self) {
        if self.rows.is_empty() || self.list_height == 0 {
            self.offset = 0;
            return;
        }
        let height = self.list_height;
        let max_offset = self.rows.len().saturating_sub(height);

        if self.cursor < self.offset {
            self.offset = self.cursor;
        } else if self.cursor >= self.offset + height {
            self.offset = self.cursor + 1 - height;
        }

        if self.offset > max_offset {
            self.offset = max_offset;
        }
    }
}

/// Step through `None → options[0] → … → options[last] → None`.
///
/// A current value no longer in `options` restarts from `None`.
fn cycle_option<T: Clone + PartialEq>(options: &[T], current: &Option<T>) -> Option<T> {
    match current {
        None => options.first().cloned(),
        Some(value) => options
            .iter()
            .position(|option| option == value)
            .and_then(|idx| options.get(idx + 1))
            .cloned(),
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(count: usize) -> Vec<Train> {
        (0..count)
            .map(|idx| Train::new(format!("T{idx}"), "SJ", Country::SE))
            .collect()
    }

    #[test]
    fn cycle_walks_options_then_resets() {
        let options = ["a", "b"];
        let first = cycle_option(&options, &None);
        assert_eq!(first, Some("a"));
        let second = cycle_option(&options, &first);
        assert_eq!(second, Some("b"));
        assert_eq!(cycle_option(&options, &second), None);
        assert_eq!(cycle_option(&options, &Some("zzz")), None);
        assert_eq!(cycle_option::<&str>(&[], &None), None);
    }

    #[test]
    fn cursor_scrolls_window() {
        let mut state = UiState {
            rows: rows(10),
            list_height: 3,
            ..UiState::default()
        };
        state.move_cursor(4);
        assert_eq!(state.cursor, 4);
        assert_eq!(state.offset, 2);
        assert_eq!(state.visible_rows(3).len(), 3);
        assert_eq!(state.current_train().map(|t| t.id.as_str()), Some("T4"));

        state.move_to_end();
        assert_eq!(state.offset, 7);
        state.move_to(0);
        assert_eq!(state.offset, 0);
        state.page_down();
        assert_eq!(state.cursor, 3);
    }

    #[test]
    fn clamp_after_rows_shrink() {
        let mut state = UiState {
            rows: rows(5),
            cursor: 4,
            ..UiState::default()
        };
        state.rows.truncate(2);
        state.clamp_cursor();
        assert_eq!(state.cursor, 1);
        state.rows.clear();
        state.clamp_cursor();
        assert_eq!(state.cursor, 0);
        assert!(state.current_train().is_none());
    }

    #[test]
    fn batch_prompt_field_wraps() {
        let mut prompt = BatchPrompt::new(vec!["1".to_string()]);
        assert_eq!(prompt.field(), EditableField::ALL[0]);
        prompt.move_field(-1);
        assert_eq!(prompt.field(), EditableField::ALL[EditableField::ALL.len() - 1]);
        prompt.move_field(1);
        assert_eq!(prompt.field_cursor, 0);
    }
}
