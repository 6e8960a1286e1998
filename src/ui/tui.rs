//! Ratatui-based board: a resource list on the left and the four status panes
//! stacked on the right (Satisfied at the top, Unprocessed at the bottom).

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use crossterm::{ExecutableCommand, execute};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use std::io::{self, Stdout};
use std::time::Duration;
use tracing::{info, warn};

use crate::navigator::{Navigator, Pane, StatusChange};
use crate::storage::{Database, PersistenceGateway, StoreError};
use crate::sync::SyncReport;
use crate::ui::components::theme::ThemePalette;
use crate::ui::shortcuts;

/// Commands reachable from the keyboard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    NextPane,
    PrevPane,
    CursorDown,
    CursorUp,
    Promote,
    Demote,
    Save,
    Quit,
}

/// Key bindings; promote/demote only exist in the status panes.
pub fn action_for_key(pane: Pane, key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c')).then_some(Action::Quit);
    }
    let in_status_pane = pane.status().is_some();
    match key.code {
        KeyCode::Char('n') => Some(Action::NextPane),
        KeyCode::Char('N') => Some(Action::PrevPane),
        KeyCode::Char('j') => Some(Action::CursorDown),
        KeyCode::Char('k') => Some(Action::CursorUp),
        KeyCode::Char('s') => Some(Action::Save),
        KeyCode::Char('J') if in_status_pane => Some(Action::Demote),
        KeyCode::Char('K') if in_status_pane => Some(Action::Promote),
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        _ => None,
    }
}

pub fn footer_legend(pane: Pane) -> String {
    let mut legend = format!(
        "{}/{} pane | {}/{} move | {} save",
        shortcuts::NEXT_PANE,
        shortcuts::PREV_PANE,
        shortcuts::CURSOR_DOWN,
        shortcuts::CURSOR_UP,
        shortcuts::SAVE,
    );
    if pane.status().is_some() {
        legend.push_str(&format!(
            " | {}/{} demote/promote",
            shortcuts::DEMOTE,
            shortcuts::PROMOTE
        ));
    }
    legend.push_str(&format!(" | {} quit", shortcuts::QUIT));
    legend
}

pub const UNSAVED_WARNING: &str = "unsaved changes: s to save, q again to quit";

/// Interactive session: the database, where it is saved, and the navigator
/// over it.
pub struct App {
    db: Database,
    gateway: PersistenceGateway,
    nav: Navigator,
    message: String,
    quit_armed: bool,
    should_quit: bool,
}

impl App {
    pub fn new(
        db: Database,
        gateway: PersistenceGateway,
        report: &SyncReport,
    ) -> Result<Self, StoreError> {
        let mut nav = Navigator::new(&db)?;
        let inserted = report.total_inserted();
        if inserted > 0 {
            nav.mark_dirty();
        }
        Ok(Self {
            db,
            gateway,
            nav,
            message: format!("{inserted} new items from {} feeds", report.resources.len()),
            quit_armed: false,
            should_quit: false,
        })
    }

    pub fn navigator(&self) -> &Navigator {
        &self.nav
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Applies one command. Failures are reported on the status line and
    /// leave the session running.
    pub fn handle(&mut self, action: Action) {
        let armed = std::mem::take(&mut self.quit_armed);
        let result = match action {
            Action::NextPane => {
                self.nav.advance();
                Ok(())
            }
            Action::PrevPane => {
                self.nav.retreat();
                Ok(())
            }
            Action::CursorDown => self.nav.cursor_down(&self.db),
            Action::CursorUp => self.nav.cursor_up(&self.db),
            Action::Promote => self.nav.promote(&mut self.db).map(|c| self.note_change(c)),
            Action::Demote => self.nav.demote(&mut self.db).map(|c| self.note_change(c)),
            Action::Save => self.save(),
            Action::Quit => {
                if self.nav.is_dirty() && !armed {
                    self.quit_armed = true;
                    self.message = UNSAVED_WARNING.to_string();
                } else {
                    self.should_quit = true;
                }
                Ok(())
            }
        };
        if let Err(err) = result {
            warn!(?action, error = %err, "command failed");
            self.message = format!("error: {err}");
        }
    }

    fn note_change(&mut self, change: Option<StatusChange>) {
        if let Some(change) = change {
            self.message = format!("{}: {} -> {}", change.description, change.from, change.to);
        }
    }

    fn save(&mut self) -> Result<(), StoreError> {
        self.nav.save(&self.db, &self.gateway)?;
        info!(path = %self.gateway.path().display(), "saved board");
        self.message = format!("saved {}", self.gateway.path().display());
        Ok(())
    }
}

fn pane_rows(nav: &Navigator, pane: Pane) -> Vec<&str> {
    match pane.status() {
        None => nav.resources().iter().map(String::as_str).collect(),
        Some(status) => nav
            .breakdown()
            .items(status)
            .iter()
            .map(|item| item.description.as_str())
            .collect(),
    }
}

/// Draws the board and reports each pane's visible height to the navigator.
pub fn render(frame: &mut Frame, app: &mut App) {
    let palette = ThemePalette::dark();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25), Constraint::Percentage(75)])
        .split(rows[0]);
    let stack = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(columns[1]);

    let areas = [
        (Pane::Resources, columns[0]),
        (Pane::Satisfied, stack[0]),
        (Pane::Pending, stack[1]),
        (Pane::Someday, stack[2]),
        (Pane::Unprocessed, stack[3]),
    ];

    for (pane, area) in areas {
        app.nav
            .set_viewport_height(pane, usize::from(area.height.saturating_sub(2)));
    }

    let nav = &app.nav;
    for (pane, area) in areas {
        let focused = nav.focused() == pane;
        let cursor = nav.cursor(pane);
        let height = usize::from(area.height.saturating_sub(2));
        let lines = pane_rows(nav, pane);
        let items: Vec<ListItem> = lines
            .iter()
            .enumerate()
            .skip(cursor.offset)
            .take(height)
            .map(|(idx, text)| {
                let style = if focused && idx == cursor.position() {
                    palette.selection()
                } else {
                    palette.row()
                };
                ListItem::new(format!("  {text}")).style(style)
            })
            .collect();
        let title = match pane {
            Pane::Resources => pane.title().to_string(),
            _ => format!("{} ({})", pane.title(), lines.len()),
        };
        let block = Block::default()
            .title(Span::styled(title, palette.title()))
            .borders(Borders::ALL)
            .border_style(palette.border_style(focused));
        frame.render_widget(List::new(items).block(block), area);
    }

    let mut footer = vec![Span::styled(
        footer_legend(nav.focused()),
        palette.hint_style(),
    )];
    if let Some(item) = nav.selected_item()
        && !item.link.is_empty()
    {
        footer.push(Span::raw("  "));
        footer.push(Span::styled(item.link.clone(), palette.row()));
    }
    if !app.message.is_empty() {
        let style = if app.message.starts_with("error:") {
            palette.error_style()
        } else {
            palette.title()
        };
        footer.push(Span::raw("  "));
        footer.push(Span::styled(app.message.clone(), style));
    }
    frame.render_widget(Paragraph::new(Line::from(footer)), rows[1]);
}

pub fn run_tui(db: Database, gateway: PersistenceGateway, report: &SyncReport) -> Result<()> {
    let mut app = App::new(db, gateway, report)?;

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app);
    teardown_terminal()?;
    terminal.show_cursor()?;
    if app.navigator().is_dirty() {
        warn!("quit with unsaved changes");
    }
    result
}

fn event_loop(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut needs_draw = true;

    while !app.should_quit() {
        if needs_draw {
            terminal.draw(|f| render(f, app))?;
            needs_draw = false;
        }
        if !event::poll(tick_rate)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if let Some(action) = action_for_key(app.navigator().focused(), key) {
                    app.handle(action);
                }
                needs_draw = true;
            }
            Event::Resize(..) => needs_draw = true,
            _ => {}
        }
    }
    Ok(())
}

fn teardown_terminal() -> Result<()> {
    let mut stdout = io::stdout();
    disable_raw_mode()?;
    execute!(stdout, LeaveAlternateScreen)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{Item, Resource, Status};
    use crate::storage::Table;
    use tempfile::TempDir;

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn app_in(dir: &TempDir) -> App {
        let db = Database::new(
            Table::from_records([Resource::new("Blog", "rss://blog/feed")]).unwrap(),
            Table::from_records([Item::new("Post A")
                .with_resource("Blog")
                .with_link("http://a")])
            .unwrap(),
        );
        let gateway = PersistenceGateway::for_path(dir.path().join("board.json")).unwrap();
        App::new(db, gateway, &SyncReport::default()).unwrap()
    }

    #[test]
    fn promote_keys_only_bind_in_status_panes() {
        assert_eq!(action_for_key(Pane::Resources, key('K')), None);
        assert_eq!(action_for_key(Pane::Resources, key('J')), None);
        assert_eq!(action_for_key(Pane::Pending, key('K')), Some(Action::Promote));
        assert_eq!(action_for_key(Pane::Pending, key('J')), Some(Action::Demote));
        assert_eq!(action_for_key(Pane::Resources, key('n')), Some(Action::NextPane));
        assert_eq!(
            action_for_key(
                Pane::Someday,
                KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
            ),
            Some(Action::Quit)
        );
    }

    #[test]
    fn quit_with_unsaved_changes_needs_confirmation() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        app.handle(Action::NextPane);
        app.handle(Action::Promote);
        assert!(app.navigator().is_dirty());

        app.handle(Action::Quit);
        assert!(!app.should_quit());
        assert_eq!(app.message(), UNSAVED_WARNING);

        app.handle(Action::CursorUp);
        app.handle(Action::Quit);
        assert!(!app.should_quit());
        app.handle(Action::Quit);
        assert!(app.should_quit());
    }

    #[test]
    fn save_writes_file_and_clears_dirty() {
        let dir = TempDir::new().unwrap();
        let mut app = app_in(&dir);
        app.handle(Action::NextPane);
        app.handle(Action::Promote);
        app.handle(Action::Save);
        assert!(!app.navigator().is_dirty());
        assert!(app.message().starts_with("saved"));

        let saved = PersistenceGateway::for_path(dir.path().join("board.json"))
            .unwrap()
            .load()
            .unwrap();
        let item = saved.items().unwrap().get("Post A").unwrap();
        assert_eq!(item.status, Status::Someday);

        app.handle(Action::Quit);
        assert!(app.should_quit());
    }

    #[test]
    fn save_failure_is_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(Table::new(), Table::new());
        let gateway =
            PersistenceGateway::for_path(dir.path().join("missing").join("board.json")).unwrap();
        let mut app = App::new(db, gateway, &SyncReport::default()).unwrap();
        app.handle(Action::Save);
        assert!(app.message().starts_with("error:"));
        assert!(!app.should_quit());
    }

    #[test]
    fn legend_mentions_promotion_only_in_status_panes() {
        assert!(!footer_legend(Pane::Resources).contains("promote"));
        assert!(footer_legend(Pane::Satisfied).contains("J/K demote/promote"));
    }
}
