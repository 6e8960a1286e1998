//! Per-resource grouping of items by status.

use crate::model::types::{ItemField, Status};
use crate::storage::{Database, Filter, Query, StoreError};

/// The part of an item a status pane shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSummary {
    pub description: String,
    pub link: String,
}

/// Items of one resource, one list per status, each sorted by description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Breakdown {
    lists: [Vec<ItemSummary>; 4],
}

impl Breakdown {
    pub fn items(&self, status: Status) -> &[ItemSummary] {
        &self.lists[status.index()]
    }

    pub fn get(&self, status: Status, row: usize) -> Option<&ItemSummary> {
        self.items(status).get(row)
    }

    pub fn len(&self) -> usize {
        self.lists.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.iter().all(Vec::is_empty)
    }

    /// Iterates statuses with their lists in status order.
    pub fn iter(&self) -> impl Iterator<Item = (Status, &[ItemSummary])> {
        Status::ALL
            .into_iter()
            .map(move |status| (status, self.items(status)))
    }
}

/// Rebuilds the breakdown for `resource` from the current item table.
///
/// Pure read; ordering is by code point of the description, so the same
/// snapshot always yields the same lists.
pub fn recompute(db: &Database, resource: &str) -> Result<Breakdown, StoreError> {
    let rows = db
        .items()?
        .query(&Query::new().filter(Filter::eq(ItemField::Resource, resource)));

    let mut breakdown = Breakdown::default();
    for item in rows {
        breakdown.lists[item.status.index()].push(ItemSummary {
            description: item.description.clone(),
            link: item.link.clone(),
        });
    }
    for list in &mut breakdown.lists {
        list.sort_by(|a, b| a.description.cmp(&b.description));
    }
    Ok(breakdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{Item, Resource};
    use crate::storage::Table;

    fn board() -> Database {
        Database::new(
            Table::from_records([Resource::new("Blog", "x"), Resource::new("News", "y")]).unwrap(),
            Table::from_records([
                Item::new("zeta").with_resource("Blog"),
                Item::new("Alpha").with_resource("Blog"),
                Item::new("beta").with_resource("Blog").with_status(Status::Pending),
                Item::new("gamma").with_resource("News"),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn groups_by_status_and_sorts_by_code_point() {
        let breakdown = recompute(&board(), "Blog").unwrap();
        let unprocessed: Vec<&str> = breakdown
            .items(Status::Unprocessed)
            .iter()
            .map(|i| i.description.as_str())
            .collect();
        assert_eq!(unprocessed, vec!["Alpha", "zeta"]);
        assert_eq!(breakdown.items(Status::Pending)[0].description, "beta");
        assert!(breakdown.items(Status::Someday).is_empty());
        assert_eq!(breakdown.len(), 3);
    }

    #[test]
    fn unknown_resource_yields_empty_breakdown() {
        let breakdown = recompute(&board(), "Nobody").unwrap();
        assert!(breakdown.is_empty());
    }

    #[test]
    fn missing_items_table_is_reported() {
        let mut db = board();
        db.remove_items_table();
        assert!(recompute(&db, "Blog").unwrap_err().is_configuration());
    }
}
