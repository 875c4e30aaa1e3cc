//! The reactive core that sits between the input observables and the photo
//! client. It debounces text edits, keeps at most one authoritative attempt
//! in flight by sequence number, and routes results, errors and the busy flag
//! to whoever is observing.

use std::cell::Cell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use chrono::Utc;
use log::{debug, info, warn};

use crate::config::Config;
use crate::coordinator::{self, CoordHandle};
use crate::date_range::DateRangeCoordinator;
use crate::observable::{EventStream, Observable};
use crate::search_types::{PhotoFinder, PhotoRecord, SearchOutcome, SearchQuery};

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub debounce_window: Duration,
    pub min_query_len: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            debounce_window: Duration::from_millis(300),
            min_query_len: 1,
        }
    }
}

impl From<&Config> for OrchestratorSettings {
    fn from(config: &Config) -> Self {
        Self {
            debounce_window: Duration::from_millis(config.debounce_ms),
            min_query_len: config.min_query_len,
        }
    }
}

struct Delivery {
    attempt: u64,
    outcome: SearchOutcome,
}

pub struct SearchOrchestrator {
    pub search_text: Observable<String>,
    pub creative_commons_only: Observable<bool>,
    pub date_filter_enabled: Observable<bool>,
    pub dates: DateRangeCoordinator,
    pub valid_search_text: Observable<bool>,
    pub search_in_progress: Observable<bool>,
    pub search_results: Observable<Vec<PhotoRecord>>,
    pub error_messages: EventStream<String>,
    client: Rc<dyn PhotoFinder>,
    settings: OrchestratorSettings,
    deliveries: CoordHandle<Delivery>,
    // Sequence number of the most recently issued attempt; an arriving
    // outcome is applied only when it matches.
    latest_attempt: Cell<u64>,
    // Bumped on every text edit so an elapsed debounce timer can tell
    // whether it is still the newest one.
    text_edit_generation: Cell<u64>,
    weak_self: Weak<SearchOrchestrator>,
}

impl SearchOrchestrator {
    /// Builds the orchestrator and wires its inputs. Must run on the
    /// coordination context (see [`coordinator::run`]); everything the
    /// returned handle exposes stays on that context.
    pub fn new(client: Rc<dyn PhotoFinder>, settings: OrchestratorSettings) -> Rc<Self> {
        let orchestrator = Rc::new_cyclic(|weak: &Weak<Self>| {
            let handler = weak.clone();
            let deliveries = coordinator::inbox(move |delivery: Delivery| {
                if let Some(orchestrator) = handler.upgrade() {
                    orchestrator.apply(delivery);
                }
            });

            let search_text = Observable::new(String::new());
            let min_query_len = settings.min_query_len;
            let valid_search_text =
                search_text.map(move |text| is_searchable(text, min_query_len));

            Self {
                search_text,
                creative_commons_only: Observable::new(false),
                date_filter_enabled: Observable::new(false),
                dates: DateRangeCoordinator::new(Utc::now()),
                valid_search_text,
                search_in_progress: Observable::new(false),
                search_results: Observable::new(Vec::new()),
                error_messages: EventStream::new(),
                client,
                settings,
                deliveries,
                latest_attempt: Cell::new(0),
                text_edit_generation: Cell::new(0),
                weak_self: weak.clone(),
            }
        });
        orchestrator.wire();
        orchestrator
    }

    fn wire(&self) {
        let weak = self.weak_self.clone();
        self.search_text.subscribe(move |_| {
            if let Some(orchestrator) = weak.upgrade() {
                orchestrator.schedule_debounced_search();
            }
        });

        // Filter changes bypass the debounce; they re-run the search with
        // whatever text is current.
        let weak = self.weak_self.clone();
        self.creative_commons_only.subscribe(move |_| {
            if let Some(orchestrator) = weak.upgrade() {
                orchestrator.attempt_search();
            }
        });

        let weak = self.weak_self.clone();
        self.date_filter_enabled.subscribe(move |_| {
            if let Some(orchestrator) = weak.upgrade() {
                orchestrator.attempt_search();
            }
        });

        for bound in [&self.dates.min_date, &self.dates.max_date] {
            let weak = self.weak_self.clone();
            bound.subscribe(move |_| {
                if let Some(orchestrator) = weak.upgrade() {
                    if orchestrator.date_filter_enabled.get() {
                        orchestrator.attempt_search();
                    }
                }
            });
        }
    }

    fn schedule_debounced_search(&self) {
        let generation = self.text_edit_generation.get().wrapping_add(1);
        self.text_edit_generation.set(generation);

        let weak = self.weak_self.clone();
        let window = self.settings.debounce_window;
        tokio::task::spawn_local(async move {
            tokio::time::sleep(window).await;
            if let Some(orchestrator) = weak.upgrade() {
                // A later edit restarted the window; let its timer decide.
                if orchestrator.text_edit_generation.get() == generation {
                    orchestrator.attempt_search();
                }
            }
        });
    }

    fn attempt_search(&self) {
        let attempt = self.latest_attempt.get() + 1;
        self.latest_attempt.set(attempt);

        let text = self.search_text.get();
        if !is_searchable(&text, self.settings.min_query_len) {
            // No search for unsearchable text; bumping the attempt number
            // above already superseded anything still in flight.
            debug!("Query text not searchable, clearing results");
            self.search_in_progress.set(false);
            self.search_results.set(Vec::new());
            return;
        }

        let query = SearchQuery {
            text,
            creative_commons_only: self.creative_commons_only.get(),
            date_filter_enabled: self.date_filter_enabled.get(),
            min_date: self.dates.min_date.get(),
            max_date: self.dates.max_date.get(),
        };

        debug!("Issuing search attempt {} for '{}'", attempt, query.text);
        self.search_in_progress.set(true);

        let deliveries = self.deliveries.clone();
        let deliver = Box::new(move |outcome| {
            deliveries.post(Delivery { attempt, outcome });
        });
        if let Err(error) = self.client.find(query, deliver) {
            self.search_in_progress.set(false);
            self.error_messages.publish(&error.to_string());
        }
    }

    fn apply(&self, delivery: Delivery) {
        if delivery.attempt != self.latest_attempt.get() {
            debug!(
                "Discarding outcome of superseded attempt {} (latest is {})",
                delivery.attempt,
                self.latest_attempt.get()
            );
            return;
        }

        self.search_in_progress.set(false);
        match delivery.outcome {
            Ok(records) => {
                info!(
                    "Attempt {} accepted with {} photos",
                    delivery.attempt,
                    records.len()
                );
                self.search_results.set(records);
            }
            Err(error) => {
                warn!("Attempt {} failed: {}", delivery.attempt, error);
                self.error_messages.publish(&error.to_string());
            }
        }
    }
}

fn is_searchable(text: &str, min_query_len: usize) -> bool {
    text.trim().chars().count() >= min_query_len.max(1)
}
