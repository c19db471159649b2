//! Feed manager: keeps track of which external ids are live and reports
//! new, updated and removed entries to an [`EntityHandler`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc::UnboundedSender;

use crate::entry::QuakeEntry;
use crate::feed::{QuakesFeed, UpdateStatus};

/// Receives change notifications, one call per external id.
#[async_trait]
pub trait EntityHandler: Send + Sync {
    async fn generate(&self, external_id: &str);
    async fn update(&self, external_id: &str);
    async fn remove(&self, external_id: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityEvent {
    Generated(String),
    Updated(String),
    Removed(String),
}

/// Forward every change as a message. A closed receiver is ignored.
#[async_trait]
impl EntityHandler for UnboundedSender<EntityEvent> {
    async fn generate(&self, external_id: &str) {
        let _ = self.send(EntityEvent::Generated(external_id.to_string()));
    }

    async fn update(&self, external_id: &str) {
        let _ = self.send(EntityEvent::Updated(external_id.to_string()));
    }

    async fn remove(&self, external_id: &str) {
        let _ = self.send(EntityEvent::Removed(external_id.to_string()));
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

#[async_trait]
impl EntityHandler for LoggingHandler {
    async fn generate(&self, external_id: &str) {
        tracing::info!(target: "quakes", %external_id, "new quake");
    }

    async fn update(&self, external_id: &str) {
        tracing::debug!(target: "quakes", %external_id, "quake updated");
    }

    async fn remove(&self, external_id: &str) {
        tracing::info!(target: "quakes", %external_id, "quake removed");
    }
}

// --- Test helper ---
#[derive(Debug, Default)]
pub struct RecordingHandler {
    pub calls: Mutex<Vec<EntityEvent>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<EntityEvent> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn push(&self, ev: EntityEvent) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(ev);
        }
    }
}

#[async_trait]
impl EntityHandler for RecordingHandler {
    async fn generate(&self, external_id: &str) {
        self.push(EntityEvent::Generated(external_id.to_string()));
    }

    async fn update(&self, external_id: &str) {
        self.push(EntityEvent::Updated(external_id.to_string()));
    }

    async fn remove(&self, external_id: &str) {
        self.push(EntityEvent::Removed(external_id.to_string()));
    }
}

#[async_trait]
impl<H: EntityHandler + ?Sized> EntityHandler for std::sync::Arc<H> {
    async fn generate(&self, external_id: &str) {
        (**self).generate(external_id).await
    }

    async fn update(&self, external_id: &str) {
        (**self).update(external_id).await
    }

    async fn remove(&self, external_id: &str) {
        (**self).remove(external_id).await
    }
}

/// What one [`QuakesFeedManager::update`] did.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSummary {
    pub status: UpdateStatus,
    pub generated: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
    pub last_timestamp: Option<DateTime<Utc>>,
}

pub struct QuakesFeedManager {
    feed: QuakesFeed,
    handler: Box<dyn EntityHandler>,
    feed_entries: BTreeMap<String, QuakeEntry>,
    managed_external_ids: BTreeSet<String>,
    last_update: Option<DateTime<Utc>>,
    last_update_successful: Option<DateTime<Utc>>,
}

impl QuakesFeedManager {
    pub fn new(feed: QuakesFeed, handler: Box<dyn EntityHandler>) -> Self {
        Self {
            feed,
            handler,
            feed_entries: BTreeMap::new(),
            managed_external_ids: BTreeSet::new(),
            last_update: None,
            last_update_successful: None,
        }
    }

    pub fn feed(&self) -> &QuakesFeed {
        &self.feed
    }

    /// Entries of the last successful update, keyed by external id.
    pub fn feed_entries(&self) -> &BTreeMap<String, QuakeEntry> {
        &self.feed_entries
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.feed.last_timestamp()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn last_update_successful(&self) -> Option<DateTime<Utc>> {
        self.last_update_successful
    }

    /// Poll the feed once and notify the handler about every change.
    pub async fn update(&mut self) -> UpdateSummary {
        let update = self.feed.update().await;
        let mut summary = UpdateSummary {
            status: update.status,
            generated: Vec::new(),
            updated: Vec::new(),
            removed: Vec::new(),
            last_timestamp: None,
        };

        match update.status {
            UpdateStatus::Ok => {
                let entries = update.entries.unwrap_or_default();
                self.feed_entries = key_by_external_id(entries);
                let current: BTreeSet<String> = self.feed_entries.keys().cloned().collect();

                summary.removed = self
                    .managed_external_ids
                    .difference(&current)
                    .cloned()
                    .collect();
                summary.updated = self
                    .managed_external_ids
                    .intersection(&current)
                    .cloned()
                    .collect();
                summary.generated = current
                    .difference(&self.managed_external_ids)
                    .cloned()
                    .collect();

                for id in &summary.removed {
                    self.handler.remove(id).await;
                }
                for id in &summary.updated {
                    self.handler.update(id).await;
                }
                for id in &summary.generated {
                    self.handler.generate(id).await;
                }
                self.managed_external_ids = current;
            }
            UpdateStatus::OkNoData => {
                tracing::debug!("quakes feed unchanged");
            }
            UpdateStatus::Error => {
                summary.removed = std::mem::take(&mut self.managed_external_ids)
                    .into_iter()
                    .collect();
                for id in &summary.removed {
                    self.handler.remove(id).await;
                }
                self.feed_entries.clear();
            }
        }

        let now = self.feed.now();
        self.last_update = Some(now);
        if update.status != UpdateStatus::Error {
            self.last_update_successful = Some(now);
        }
        summary.last_timestamp = self.feed.last_timestamp();
        summary
    }
}

impl fmt::Display for QuakesFeedManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuakesFeedManager(feed={})", self.feed)
    }
}

fn key_by_external_id(entries: Vec<QuakeEntry>) -> BTreeMap<String, QuakeEntry> {
    let mut out = BTreeMap::new();
    for entry in entries {
        match entry.external_id().map(str::to_string) {
            Some(id) => {
                out.insert(id, entry);
            }
            None => tracing::warn!(%entry, "quake entry without publicID cannot be tracked"),
        }
    }
    out
}
