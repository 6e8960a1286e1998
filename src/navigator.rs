//! Pane focus, cursors, and status changes for the board.
//!
//! The five panes form a ring (`Resources → Unprocessed → Someday → Pending →
//! Satisfied → Resources`) described by [`RING`]. Cursor rows are mapped back
//! to item records through the current [`Breakdown`], which is rebuilt from the
//! store after every selection or status change.

use tracing::debug;

use crate::breakdown::{self, Breakdown, ItemSummary};
use crate::model::types::{ItemField, Status};
use crate::storage::{Database, PersistenceGateway, StoreError};
use crate::sync::feed_resources_query;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pane {
    Resources,
    Unprocessed,
    Someday,
    Pending,
    Satisfied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// One row of the focus transition table.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub from: Pane,
    pub forward: Pane,
    pub backward: Pane,
}

/// Focus transitions, indexed by [`Pane::index`].
pub const RING: [Transition; 5] = [
    Transition {
        from: Pane::Resources,
        forward: Pane::Unprocessed,
        backward: Pane::Satisfied,
    },
    Transition {
        from: Pane::Unprocessed,
        forward: Pane::Someday,
        backward: Pane::Resources,
    },
    Transition {
        from: Pane::Someday,
        forward: Pane::Pending,
        backward: Pane::Unprocessed,
    },
    Transition {
        from: Pane::Pending,
        forward: Pane::Satisfied,
        backward: Pane::Someday,
    },
    Transition {
        from: Pane::Satisfied,
        forward: Pane::Resources,
        backward: Pane::Pending,
    },
];

impl Pane {
    pub const ALL: [Pane; 5] = [
        Pane::Resources,
        Pane::Unprocessed,
        Pane::Someday,
        Pane::Pending,
        Pane::Satisfied,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// The status a pane lists, or `None` for the resource pane.
    pub fn status(self) -> Option<Status> {
        match self {
            Pane::Resources => None,
            Pane::Unprocessed => Some(Status::Unprocessed),
            Pane::Someday => Some(Status::Someday),
            Pane::Pending => Some(Status::Pending),
            Pane::Satisfied => Some(Status::Satisfied),
        }
    }

    pub fn for_status(status: Status) -> Pane {
        match status {
            Status::Unprocessed => Pane::Unprocessed,
            Status::Someday => Pane::Someday,
            Status::Pending => Pane::Pending,
            Status::Satisfied => Pane::Satisfied,
        }
    }

    pub fn title(self) -> &'static str {
        match self.status() {
            Some(status) => status.label(),
            None => "Resources",
        }
    }

    pub fn step(self, direction: Direction) -> Pane {
        let transition = RING[self.index()];
        debug_assert_eq!(transition.from, self);
        match direction {
            Direction::Forward => transition.forward,
            Direction::Backward => transition.backward,
        }
    }
}

/// Cursor within a pane: `row` is relative to the scroll window that starts
/// at `offset`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub row: usize,
    pub offset: usize,
}

impl Cursor {
    /// Absolute list index under the cursor.
    pub fn position(self) -> usize {
        self.offset + self.row
    }

    fn down(self, viewport: usize) -> Cursor {
        if self.row + 1 < viewport {
            Cursor {
                row: self.row + 1,
                ..self
            }
        } else {
            Cursor {
                offset: self.offset + 1,
                ..self
            }
        }
    }

    fn up(self) -> Cursor {
        if self.row > 0 {
            Cursor {
                row: self.row - 1,
                ..self
            }
        } else {
            Cursor {
                offset: self.offset.saturating_sub(1),
                ..self
            }
        }
    }
}

/// A status change applied by [`Navigator::promote`] or [`Navigator::demote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub description: String,
    pub from: Status,
    pub to: Status,
}

/// Focus/cursor state machine over the board.
///
/// Holds no copy of the records beyond the most recent breakdown; every
/// mutation goes through the item table and is followed by a recompute.
#[derive(Debug, Clone)]
pub struct Navigator {
    focused: Pane,
    cursors: [Cursor; 5],
    viewports: [usize; 5],
    resources: Vec<String>,
    selected: Option<String>,
    breakdown: Breakdown,
    dirty: bool,
}

impl Navigator {
    /// Lists the feed-backed resources and selects the first one.
    pub fn new(db: &Database) -> Result<Self, StoreError> {
        let resources = db
            .resources()?
            .query(&feed_resources_query())
            .into_iter()
            .map(|resource| resource.description.clone())
            .collect();
        let mut navigator = Self {
            focused: Pane::Resources,
            cursors: [Cursor::default(); 5],
            viewports: [usize::MAX; 5],
            resources,
            selected: None,
            breakdown: Breakdown::default(),
            dirty: false,
        };
        navigator.select_resource(db, 0)?;
        Ok(navigator)
    }

    pub fn focused(&self) -> Pane {
        self.focused
    }

    pub fn cursor(&self, pane: Pane) -> Cursor {
        self.cursors[pane.index()]
    }

    pub fn resources(&self) -> &[String] {
        &self.resources
    }

    pub fn selected_resource(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn breakdown(&self) -> &Breakdown {
        &self.breakdown
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Records how many rows of `pane` are visible; the cursor is pulled back
    /// into the window (keeping its absolute position) when it shrinks.
    pub fn set_viewport_height(&mut self, pane: Pane, height: usize) {
        let idx = pane.index();
        self.viewports[idx] = height;
        let cursor = &mut self.cursors[idx];
        if height > 0 && cursor.row >= height {
            let excess = cursor.row - (height - 1);
            cursor.offset += excess;
            cursor.row -= excess;
        }
    }

    pub fn advance(&mut self) {
        self.focused = self.focused.step(Direction::Forward);
    }

    pub fn retreat(&mut self) {
        self.focused = self.focused.step(Direction::Backward);
    }

    pub fn focus(&mut self, pane: Pane) {
        self.focused = pane;
    }

    pub fn cursor_down(&mut self, db: &Database) -> Result<(), StoreError> {
        let idx = self.focused.index();
        let moved = self.cursors[idx].down(self.viewports[idx]);
        self.move_cursor(db, moved)
    }

    /// Never moves above the first row.
    pub fn cursor_up(&mut self, db: &Database) -> Result<(), StoreError> {
        let moved = self.cursors[self.focused.index()].up();
        self.move_cursor(db, moved)
    }

    fn move_cursor(&mut self, db: &Database, moved: Cursor) -> Result<(), StoreError> {
        if self.focused == Pane::Resources {
            self.select_resource(db, moved.position())?;
        }
        self.cursors[self.focused.index()] = moved;
        Ok(())
    }

    /// Shows the items of the listed resource at `row`. A row past the end of
    /// the list selects nothing.
    pub fn select_resource(&mut self, db: &Database, row: usize) -> Result<(), StoreError> {
        let selected = self.resources.get(row).cloned();
        let breakdown = match &selected {
            Some(resource) => breakdown::recompute(db, resource)?,
            None => {
                db.items()?;
                Breakdown::default()
            }
        };
        debug!(resource = ?selected, items = breakdown.len(), "selected resource");
        self.selected = selected;
        self.breakdown = breakdown;
        Ok(())
    }

    /// Rebuilds the breakdown for the current selection.
    pub fn refresh(&mut self, db: &Database) -> Result<(), StoreError> {
        self.breakdown = match &self.selected {
            Some(resource) => breakdown::recompute(db, resource)?,
            None => Breakdown::default(),
        };
        Ok(())
    }

    /// Item under the cursor of the focused status pane, if any.
    pub fn selected_item(&self) -> Option<&ItemSummary> {
        let status = self.focused.status()?;
        let row = self.cursors[self.focused.index()].position();
        self.breakdown.get(status, row)
    }

    /// Moves the item under the cursor one status toward `Satisfied`.
    pub fn promote(&mut self, db: &mut Database) -> Result<Option<StatusChange>, StoreError> {
        self.shift_status(db, Status::promoted)
    }

    /// Moves the item under the cursor one status toward `Unprocessed`.
    pub fn demote(&mut self, db: &mut Database) -> Result<Option<StatusChange>, StoreError> {
        self.shift_status(db, Status::demoted)
    }

    fn shift_status(
        &mut self,
        db: &mut Database,
        step: fn(Status) -> Status,
    ) -> Result<Option<StatusChange>, StoreError> {
        let Some(from) = self.focused.status() else {
            return Ok(None);
        };
        let (Some(item), Some(resource)) = (self.selected_item(), self.selected.clone()) else {
            return Ok(None);
        };
        let to = step(from);
        if to == from {
            return Ok(None);
        }
        let description = item.description.clone();

        db.items_mut()?
            .update(&description, ItemField::Status, to.label())?;
        self.breakdown = breakdown::recompute(db, &resource)?;
        self.dirty = true;
        debug!(item = %description, %from, %to, "changed status");
        Ok(Some(StatusChange {
            description,
            from,
            to,
        }))
    }

    /// Writes the whole database through the gateway and clears the dirty flag.
    pub fn save(&mut self, db: &Database, gateway: &PersistenceGateway) -> Result<(), StoreError> {
        gateway.save(db)?;
        self.dirty = false;
        Ok(())
    }
}
