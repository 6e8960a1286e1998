//! Normalized record structs for the two tables the board works with.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::storage::{Record, StoreError};

/// Processing category of an item, ordered from untouched to done.
///
/// Stored as its ordinal; names are accepted on load as well.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "StatusRepr", into = "u8")]
pub enum Status {
    #[default]
    Unprocessed,
    Someday,
    Pending,
    Satisfied,
}

impl Status {
    pub const ALL: [Status; 4] = [
        Status::Unprocessed,
        Status::Someday,
        Status::Pending,
        Status::Satisfied,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Unprocessed => "Unprocessed",
            Status::Someday => "Someday",
            Status::Pending => "Pending",
            Status::Satisfied => "Satisfied",
        }
    }

    /// One step toward `Satisfied`; saturates at the top.
    pub fn promoted(self) -> Self {
        match self {
            Status::Unprocessed => Status::Someday,
            Status::Someday => Status::Pending,
            Status::Pending | Status::Satisfied => Status::Satisfied,
        }
    }

    /// One step toward `Unprocessed`; saturates at the bottom.
    pub fn demoted(self) -> Self {
        match self {
            Status::Unprocessed | Status::Someday => Status::Unprocessed,
            Status::Pending => Status::Someday,
            Status::Satisfied => Status::Pending,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(ordinal) = trimmed.parse::<usize>() {
            return Status::from_index(ordinal)
                .ok_or_else(|| format!("status ordinal {ordinal} out of range"));
        }
        Status::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown status `{trimmed}`"))
    }
}

impl From<Status> for u8 {
    fn from(status: Status) -> Self {
        status as u8
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StatusRepr {
    Ordinal(u64),
    Name(String),
}

impl TryFrom<StatusRepr> for Status {
    type Error = String;

    fn try_from(repr: StatusRepr) -> Result<Self, Self::Error> {
        match repr {
            StatusRepr::Ordinal(n) => usize::try_from(n)
                .ok()
                .and_then(Status::from_index)
                .ok_or_else(|| format!("status ordinal {n} out of range")),
            StatusRepr::Name(name) => name.parse(),
        }
    }
}

/// A trackable subject, optionally backed by a feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Primary key; carried as the map key in the stored document.
    #[serde(skip)]
    pub description: String,
    /// Feed URL; empty means the resource has no feed.
    #[serde(rename = "Feed", alias = "FeedURL", default)]
    pub feed: String,
    /// Columns this crate does not interpret, kept for round-tripping.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource {
    pub fn new(description: impl Into<String>, feed: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            feed: feed.into(),
            extra: Map::new(),
        }
    }

    pub fn has_feed(&self) -> bool {
        !self.feed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceField {
    Description,
    Feed,
}

impl ResourceField {
    pub fn name(self) -> &'static str {
        match self {
            ResourceField::Description => "Description",
            ResourceField::Feed => "Feed",
        }
    }
}

impl fmt::Display for ResourceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Record for Resource {
    type Field = ResourceField;
    const TABLE: &'static str = "resources";

    fn key(&self) -> &str {
        &self.description
    }

    fn set_key(&mut self, key: String) {
        self.description = key;
    }

    fn with_key(key: &str) -> Self {
        Self::new(key, "")
    }

    fn field(&self, field: ResourceField) -> Cow<'_, str> {
        match field {
            ResourceField::Description => Cow::Borrowed(&self.description),
            ResourceField::Feed => Cow::Borrowed(&self.feed),
        }
    }

    fn set_field(&mut self, field: ResourceField, value: &str) -> Result<(), StoreError> {
        match field {
            ResourceField::Description => Err(StoreError::ImmutableField {
                table: Self::TABLE,
                field: field.name(),
            }),
            ResourceField::Feed => {
                self.feed = value.to_string();
                Ok(())
            }
        }
    }
}

/// A task derived from a feed entry (or created directly in the store).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Item {
    #[serde(skip)]
    pub description: String,
    #[serde(default)]
    pub link: String,
    /// Description of the owning resource.
    #[serde(default)]
    pub resource: String,
    #[serde(default)]
    pub status: Status,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Item {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            link: String::new(),
            resource: String::new(),
            status: Status::Unprocessed,
            extra: Map::new(),
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = link.into();
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = status;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Description,
    Link,
    Resource,
    Status,
}

impl ItemField {
    pub fn name(self) -> &'static str {
        match self {
            ItemField::Description => "Description",
            ItemField::Link => "Link",
            ItemField::Resource => "Resource",
            ItemField::Status => "Status",
        }
    }
}

impl fmt::Display for ItemField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Record for Item {
    type Field = ItemField;
    const TABLE: &'static str = "items";

    fn key(&self) -> &str {
        &self.description
    }

    fn set_key(&mut self, key: String) {
        self.description = key;
    }

    fn with_key(key: &str) -> Self {
        Self::new(key)
    }

    fn field(&self, field: ItemField) -> Cow<'_, str> {
        match field {
            ItemField::Description => Cow::Borrowed(&self.description),
            ItemField::Link => Cow::Borrowed(&self.link),
            ItemField::Resource => Cow::Borrowed(&self.resource),
            ItemField::Status => Cow::Borrowed(self.status.label()),
        }
    }

    fn set_field(&mut self, field: ItemField, value: &str) -> Result<(), StoreError> {
        match field {
            ItemField::Description => {
                return Err(StoreError::ImmutableField {
                    table: Self::TABLE,
                    field: field.name(),
                });
            }
            ItemField::Link => self.link = value.to_string(),
            ItemField::Resource => self.resource = value.to_string(),
            ItemField::Status => {
                self.status = value.parse().map_err(|reason| StoreError::InvalidValue {
                    table: Self::TABLE,
                    field: field.name(),
                    reason,
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_steps_saturate_at_both_ends() {
        assert_eq!(Status::Satisfied.promoted(), Status::Satisfied);
        assert_eq!(Status::Unprocessed.demoted(), Status::Unprocessed);
        assert_eq!(Status::Someday.promoted(), Status::Pending);
        assert_eq!(Status::Pending.demoted(), Status::Someday);
    }

    #[test]
    fn status_parses_names_and_ordinals() {
        assert_eq!("pending".parse::<Status>().unwrap(), Status::Pending);
        assert_eq!("3".parse::<Status>().unwrap(), Status::Satisfied);
        assert!("4".parse::<Status>().is_err());
        assert!("Done".parse::<Status>().is_err());
    }

    #[test]
    fn status_serializes_as_ordinal() {
        let json = serde_json::to_value(Status::Pending).unwrap();
        assert_eq!(json, serde_json::json!(2));
        let back: Status = serde_json::from_value(serde_json::json!("Someday")).unwrap();
        assert_eq!(back, Status::Someday);
    }

    #[test]
    fn item_keeps_unknown_columns() {
        let raw = serde_json::json!({
            "Link": "http://a",
            "Resource": "Blog",
            "Status": 1,
            "Notes": "keep me"
        });
        let item: Item = serde_json::from_value(raw).unwrap();
        assert_eq!(item.status, Status::Someday);
        assert_eq!(item.extra.get("Notes"), Some(&serde_json::json!("keep me")));
    }

    #[test]
    fn item_rejects_primary_key_update() {
        let mut item = Item::new("Post A");
        assert!(matches!(
            item.set_field(ItemField::Description, "Post B"),
            Err(StoreError::ImmutableField { .. })
        ));
        item.set_field(ItemField::Status, "Satisfied").unwrap();
        assert_eq!(item.status, Status::Satisfied);
    }
}
