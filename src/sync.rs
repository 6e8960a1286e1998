//! Feed synchronization: pull every feed-backed resource and add the entries
//! the item table has not seen yet.
//!
//! The pass is additive and first-seen-wins: existing items are never updated
//! or removed, even when the upstream title or link changes. Feeds are fetched
//! one at a time, and the first failure aborts the whole pass.
//!
//! # Example
//!
//! ```rust,ignore
//! use feedboard::feed::HttpFeedSource;
//! use feedboard::sync::FeedSyncer;
//!
//! let source = HttpFeedSource::new("feedboard", None)?;
//! let report = FeedSyncer::new(&source).synchronize(&mut db)?;
//! println!("{} new items", report.total_inserted());
//! ```

use std::collections::HashSet;

use thiserror::Error;
use tracing::{debug, info};

use crate::feed::{FeedSource, FetchError, normalize_feed_url};
use crate::model::types::{ItemField, Resource, ResourceField};
use crate::storage::{Database, Filter, Query, StoreError};

/// Errors that abort a synchronization pass.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to fetch feed for resource `{resource}` ({url}): {source}")]
    Fetch {
        resource: String,
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("{context} `{title}`: {source}")]
    Mutation {
        context: &'static str,
        title: String,
        #[source]
        source: StoreError,
    },
}

impl SyncError {
    /// Resource whose feed failed, when the failure came from the transport.
    pub fn resource(&self) -> Option<&str> {
        match self {
            SyncError::Fetch { resource, .. } => Some(resource),
            _ => None,
        }
    }
}

/// Outcome for one feed-backed resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSync {
    /// Description of the resource that was synced.
    pub resource: String,
    /// Titles added, in feed order.
    pub inserted: Vec<String>,
    /// Entries skipped because an item with that title already existed.
    pub already_known: usize,
}

/// Report from a full synchronization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub resources: Vec<ResourceSync>,
}

impl SyncReport {
    /// Total items added across all resources.
    pub fn total_inserted(&self) -> usize {
        self.resources.iter().map(|r| r.inserted.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_inserted() == 0
    }
}

/// Runs synchronization passes against a feed source.
pub struct FeedSyncer<'a> {
    source: &'a dyn FeedSource,
}

impl<'a> FeedSyncer<'a> {
    pub fn new(source: &'a dyn FeedSource) -> Self {
        Self { source }
    }

    /// Fetches every resource with a non-empty feed, in description order,
    /// and inserts unseen entries as `Unprocessed` items.
    pub fn synchronize(&self, db: &mut Database) -> Result<SyncReport, SyncError> {
        let feeds: Vec<Resource> = db
            .resources()?
            .query(&feed_resources_query())
            .into_iter()
            .cloned()
            .collect();
        // Fail before any network work if the item table is absent.
        db.items()?;

        let mut report = SyncReport::default();
        for resource in &feeds {
            let outcome = self.sync_resource(db, resource)?;
            info!(
                resource = %resource.description,
                new = outcome.inserted.len(),
                known = outcome.already_known,
                "synchronized feed"
            );
            report.resources.push(outcome);
        }
        Ok(report)
    }

    fn sync_resource(
        &self,
        db: &mut Database,
        resource: &Resource,
    ) -> Result<ResourceSync, SyncError> {
        let mut seen: HashSet<String> = db
            .items()?
            .query(&Query::new().filter(Filter::eq(ItemField::Resource, &resource.description)))
            .into_iter()
            .map(|item| item.description.clone())
            .collect();

        let url = normalize_feed_url(&resource.feed);
        let entries = self.source.fetch(&url).map_err(|source| SyncError::Fetch {
            resource: resource.description.clone(),
            url: url.clone(),
            source,
        })?;

        let items = db.items_mut()?;
        let mut outcome = ResourceSync {
            resource: resource.description.clone(),
            ..Default::default()
        };
        for entry in entries {
            if seen.contains(&entry.title) {
                outcome.already_known += 1;
                continue;
            }
            let mutation = |context| {
                let title = entry.title.clone();
                move |source| SyncError::Mutation {
                    context,
                    title,
                    source,
                }
            };
            items
                .insert(&entry.title)
                .map_err(mutation("failed to add entry"))?;
            items
                .update(&entry.title, ItemField::Link, &entry.link)
                .map_err(mutation("failed to update link for entry"))?;
            items
                .update(&entry.title, ItemField::Resource, &resource.description)
                .map_err(mutation("failed to update resource for entry"))?;
            debug!(resource = %resource.description, title = %entry.title, "added item");

            seen.insert(entry.title.clone());
            outcome.inserted.push(entry.title);
        }
        Ok(outcome)
    }
}

/// Resources that take part in synchronization (and populate the resource
/// pane): those with a feed, ordered by description.
pub fn feed_resources_query() -> Query<ResourceField> {
    Query::new()
        .filter(Filter::ne(ResourceField::Feed, ""))
        .order_by(ResourceField::Description)
}

/// Convenience wrapper around [`FeedSyncer::synchronize`].
pub fn synchronize(db: &mut Database, source: &dyn FeedSource) -> Result<SyncReport, SyncError> {
    FeedSyncer::new(source).synchronize(db)
}
