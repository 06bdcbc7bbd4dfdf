// SPDX-License-Identifier: MIT

//! Polling loop: list recent pastes, fetch each, search, save matches

use super::config::Settings;
use super::error::{PastegoError, Result};
use super::feed::{PasteEntry, PasteSource};
use super::search::SearchSet;
use super::store::ResultStore;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinSet};
use tokio::time::MissedTickBehavior;

const EVENT_CAPACITY: usize = 64;

/// A newly saved match, broadcast to reviewers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchEvent {
    pub label: String,
    pub name: String,
    pub full_url: String,
    pub expression: String,
}

/// Tally of one polling cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub scanned: usize,
    pub matched: usize,
    /// Matches written for the first time
    pub saved: usize,
    pub failed: usize,
}

impl CycleReport {
    fn record(&mut self, outcome: std::result::Result<ItemOutcome, JoinError>) {
        match outcome {
            Ok(ItemOutcome::NoMatch) => {}
            Ok(ItemOutcome::Saved) => {
                self.matched += 1;
                self.saved += 1;
            }
            Ok(ItemOutcome::AlreadySaved) => self.matched += 1,
            Ok(ItemOutcome::Failed) => self.failed += 1,
            Err(e) => {
                log::error!("Paste task failed: {}", e);
                self.failed += 1;
            }
        }
    }
}

enum ItemOutcome {
    NoMatch,
    Saved,
    AlreadySaved,
    Failed,
}

/// State shared by the per-paste tasks
struct Shared {
    source: Arc<dyn PasteSource>,
    searches: SearchSet,
    store: ResultStore,
    events: broadcast::Sender<MatchEvent>,
}

impl Shared {
    async fn process(&self, entry: PasteEntry) -> ItemOutcome {
        let body = match self.source.fetch_body(&entry).await {
            Ok(body) => body,
            Err(e) => {
                log::warn!("Failed to fetch paste {}: {}", entry.key, e);
                return ItemOutcome::Failed;
            }
        };

        let Some(found) = self.searches.find_match(&body) else {
            return ItemOutcome::NoMatch;
        };

        match self.store.save(&entry, &found.label, &body).await {
            Ok(Some(name)) => {
                log::info!("{} - {}", found.label, entry.full_url);
                // No subscribers is fine
                let _ = self.events.send(MatchEvent {
                    label: found.label,
                    name,
                    full_url: entry.full_url,
                    expression: found.expression,
                });
                ItemOutcome::Saved
            }
            Ok(None) => ItemOutcome::AlreadySaved,
            Err(e) => {
                log::warn!("Failed to save paste {}: {}", entry.key, e);
                ItemOutcome::Failed
            }
        }
    }
}

pub struct Watcher {
    shared: Arc<Shared>,
    limit: u32,
    interval: Duration,
    concurrency: usize,
}

impl Watcher {
    pub fn new(
        source: Arc<dyn PasteSource>,
        searches: SearchSet,
        store: ResultStore,
        settings: &Settings,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                source,
                searches,
                store,
                events,
            }),
            limit: settings.limit,
            interval: Duration::from_secs(settings.interval_secs),
            concurrency: settings.concurrency.max(1),
        }
    }

    /// Sender side of the match event channel, for handing to the server
    pub fn events(&self) -> broadcast::Sender<MatchEvent> {
        self.shared.events.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MatchEvent> {
        self.shared.events.subscribe()
    }

    pub fn store(&self) -> &ResultStore {
        &self.shared.store
    }

    /// Run one polling cycle over the latest listing.
    ///
    /// Dropping the returned future aborts the per-paste tasks still running.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let mut tasks = JoinSet::new();
        self.drive_cycle(&mut tasks).await
    }

    /// Process the listing with at most `concurrency` tasks in `tasks`
    async fn drive_cycle(&self, tasks: &mut JoinSet<ItemOutcome>) -> Result<CycleReport> {
        let entries = self.shared.source.latest(self.limit).await?;
        let mut report = CycleReport {
            scanned: entries.len(),
            ..Default::default()
        };

        let mut pending = entries.into_iter();
        loop {
            while tasks.len() < self.concurrency {
                let Some(entry) = pending.next() else {
                    break;
                };
                let shared = Arc::clone(&self.shared);
                tasks.spawn(async move { shared.process(entry).await });
            }
            match tasks.join_next().await {
                Some(outcome) => report.record(outcome),
                None => break,
            }
        }

        Ok(report)
    }

    /// Poll immediately, then every interval, until `shutdown` resolves
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut first = true;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }
            if !first {
                log::info!("Restarting...");
            }
            first = false;

            let mut tasks = JoinSet::new();
            let interrupted = tokio::select! {
                _ = &mut shutdown => true,
                result = self.drive_cycle(&mut tasks) => {
                    match result {
                        Ok(report) => log::info!(
                            "Done! {} scanned, {} matched, {} new, {} failed",
                            report.scanned,
                            report.matched,
                            report.saved,
                            report.failed
                        ),
                        Err(PastegoError::RateLimited) => {
                            log::warn!("Slow down! Skipping this cycle")
                        }
                        Err(e) => log::error!("Cycle failed: {}", e),
                    }
                    false
                }
            };

            if interrupted {
                log::info!("Stopping {} paste tasks in flight", tasks.len());
                tasks.shutdown().await;
                break;
            }
        }

        log::info!("Watcher stopped");
    }
}
