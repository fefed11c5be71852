//! The poll loop: scrape every source, announce what has not been seen yet.
//!
//! A listing is only recorded as seen after Discord accepted the message.
//! Failed deliveries are retried on the next cycle instead of being lost.

use std::fmt::Display;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::notify::Notifier;
use crate::source::ListingSource;
use crate::store::SeenStore;
use crate::types::{Listing, SearchConfig};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub sources_scanned: usize,
    pub sources_failed: usize,
    pub found: usize,
    pub new: usize,
    pub notified: usize,
    pub delivery_failures: usize,
    pub store_errors: usize,
}

impl CycleReport {
    pub fn is_clean(&self) -> bool {
        self.sources_failed == 0 && self.delivery_failures == 0 && self.store_errors == 0
    }
}

impl Display for CycleReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} source(s) scanned ({} failed), {} listing(s) found, {} new, {} announced",
            self.sources_scanned, self.sources_failed, self.found, self.new, self.notified
        )?;
        if self.delivery_failures > 0 {
            write!(f, ", {} delivery failure(s)", self.delivery_failures)?;
        }
        if self.store_errors > 0 {
            write!(f, ", {} store error(s)", self.store_errors)?;
        }
        Ok(())
    }
}

/// Owns everything a cycle touches: the sources, the seen store and the notifier.
pub struct Watcher<N> {
    search: SearchConfig,
    sources: Vec<Box<dyn ListingSource>>,
    store: SeenStore,
    notifier: N,
}

impl<N: Notifier> Watcher<N> {
    pub fn new(search: SearchConfig, store: SeenStore, notifier: N) -> Self {
        Self {
            search,
            sources: Vec::new(),
            store,
            notifier,
        }
    }

    /// Sources are scanned in the order they are added.
    pub fn with_source(mut self, source: impl ListingSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn store(&self) -> &SeenStore {
        &self.store
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Runs a cycle now and then every `delay` until `shutdown` is cancelled.
    ///
    /// Cancellation is only observed between cycles; a running cycle always
    /// finishes. Returns the number of completed cycles.
    pub async fn run(&self, delay: Duration, shutdown: CancellationToken) -> u64 {
        let mut ticker = tokio::time::interval(delay);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut cycles = 0;

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let report = self.run_cycle().await;
            cycles += 1;
            if report.is_clean() {
                log::info!("Cycle {} finished: {}", cycles, report);
            } else {
                log::warn!("Cycle {} finished with errors: {}", cycles, report);
            }
        }

        log::info!("Stopped after {} cycle(s)", cycles);
        cycles
    }

    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        for source in &self.sources {
            report.sources_scanned += 1;

            let listings = match source.fetch(&self.search).await {
                Ok(listings) => listings,
                Err(e) => {
                    log::error!("Failed to fetch {} listings: {}", source.source(), e);
                    report.sources_failed += 1;
                    continue;
                }
            };

            report.found += listings.len();
            let before = report.new;
            for listing in &listings {
                self.process(listing, &mut report).await;
            }
            log::info!(
                "New {} listings found: {}",
                source.source(),
                report.new - before
            );
        }

        report
    }

    async fn process(&self, listing: &Listing, report: &mut CycleReport) {
        match self.store.has_seen(listing.source, &listing.id).await {
            Ok(true) => return,
            Ok(false) => {}
            Err(e) => {
                log::error!(
                    "Failed to look up {} listing {}: {}",
                    listing.source,
                    listing.id,
                    e
                );
                report.store_errors += 1;
                return;
            }
        }

        report.new += 1;
        if let Err(e) = self.notifier.notify(listing).await {
            log::error!(
                "Failed to announce {} listing {}, will retry next cycle: {}",
                listing.source,
                listing.id,
                e
            );
            report.delivery_failures += 1;
            return;
        }
        report.notified += 1;

        if let Err(e) = self.store.mark_seen(listing.source, &listing.id).await {
            log::error!(
                "Failed to record {} listing {} as seen: {}",
                listing.source,
                listing.id,
                e
            );
            report.store_errors += 1;
        }
    }
}
