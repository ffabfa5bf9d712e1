//! Refresh orchestration over [`DashboardState`].
//!
//! All fetches go through [`Dashboard::refresh_city`] or
//! [`Dashboard::add_city`]. At most one fetch per city id is in flight; a
//! request for a city that is already being fetched is coalesced into the
//! running one.

use chrono::Utc;
use parking_lot::Mutex;
use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};
use tokio::{
    task::{JoinHandle, JoinSet},
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    CityId, CityQuery, Reading, ReadingSource, TrackedCity, WeatherError,
    fetcher::{FetchOutcome, Fetcher},
    state::DashboardState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Updated(ReadingSource),
    /// A fetch for this city was already running.
    Coalesced,
    /// The city is not (or no longer) tracked; nothing was stored.
    Untracked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added(CityId),
    /// A city with the same name was already tracked; it was refreshed instead,
    /// or joined a refresh already running for it.
    AlreadyTracked(CityId),
}

impl AddOutcome {
    pub fn id(&self) -> &CityId {
        match self {
            AddOutcome::Added(id) | AddOutcome::AlreadyTracked(id) => id,
        }
    }
}

/// Point-in-time copy of the dashboard for rendering.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub cities: Vec<TrackedCity>,
    pub readings: HashMap<CityId, Reading>,
    pub error: Option<String>,
    pub loading: bool,
}

impl Snapshot {
    pub fn reading(&self, id: &CityId) -> Option<&Reading> {
        self.readings.get(id)
    }
}

#[derive(Debug)]
struct Inner {
    fetcher: Fetcher,
    state: Mutex<DashboardState>,
    in_flight: Mutex<HashSet<CityId>>,
    /// Searches for names that are not tracked yet.
    searches: AtomicUsize,
}

/// Shared handle to the dashboard; clones refer to the same state.
#[derive(Debug, Clone)]
pub struct Dashboard {
    inner: Arc<Inner>,
}

/// Marks a city id as in flight until dropped.
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<CityId>>,
    id: CityId,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<CityId>>, id: &CityId) -> Option<Self> {
        if set.lock().insert(id.clone()) {
            Some(Self { set, id: id.clone() })
        } else {
            None
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.id);
    }
}

/// Counts a running search until dropped.
struct SearchGuard<'a>(&'a AtomicUsize);

impl<'a> SearchGuard<'a> {
    fn start(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::SeqCst);
        Self(count)
    }
}

impl Drop for SearchGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Dashboard {
    pub fn new(fetcher: Fetcher, cities: impl IntoIterator<Item = TrackedCity>) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                state: Mutex::new(DashboardState::with_cities(cities)),
                in_flight: Mutex::new(HashSet::new()),
                searches: AtomicUsize::new(0),
            }),
        }
    }

    pub fn is_offline(&self) -> bool {
        self.inner.fetcher.is_offline()
    }

    pub fn snapshot(&self) -> Snapshot {
        let loading = !self.inner.in_flight.lock().is_empty()
            || self.inner.searches.load(Ordering::SeqCst) > 0;
        let state = self.inner.state.lock();

        Snapshot {
            cities: state.cities().to_vec(),
            readings: state.readings().clone(),
            error: state.error().map(str::to_string),
            loading,
        }
    }

    pub fn clear_error(&self) {
        self.inner.state.lock().clear_error();
    }

    /// Fetches one tracked city and stores the result.
    ///
    /// Clears the error banner when the fetch starts; unrecoverable errors are
    /// written back to it.
    pub async fn refresh_city(&self, id: &CityId) -> Result<RefreshOutcome, WeatherError> {
        self.fetch_tracked(id, true).await
    }

    async fn fetch_tracked(
        &self,
        id: &CityId,
        clear_banner: bool,
    ) -> Result<RefreshOutcome, WeatherError> {
        let Some(query) = self.inner.state.lock().city(id).map(TrackedCity::query) else {
            return Ok(RefreshOutcome::Untracked);
        };

        let Some(_guard) = InFlightGuard::acquire(&self.inner.in_flight, id) else {
            tracing::debug!(city = %id, "fetch already in flight, coalescing");
            return Ok(RefreshOutcome::Coalesced);
        };

        if clear_banner {
            self.inner.state.lock().clear_error();
        }

        let outcome = self.fetch_or_report(&query).await?;
        let source = outcome.source;

        if self.inner.state.lock().record_reading(id, reading_from(outcome)) {
            Ok(RefreshOutcome::Updated(source))
        } else {
            tracing::debug!(city = %id, "city removed while fetching, dropping reading");
            Ok(RefreshOutcome::Untracked)
        }
    }

    /// Fetches every tracked city concurrently. Completion order is not
    /// defined.
    ///
    /// The banner is cleared once up front, so an error from one city is not
    /// wiped by a sibling fetch that starts later.
    pub async fn refresh_all(&self) -> Vec<(CityId, Result<RefreshOutcome, WeatherError>)> {
        let ids: Vec<CityId> = {
            let mut state = self.inner.state.lock();
            state.clear_error();
            state.cities().iter().map(|c| c.id.clone()).collect()
        };

        let mut tasks = JoinSet::new();
        for id in ids {
            let dashboard = self.clone();
            tasks.spawn(async move {
                let result = dashboard.fetch_tracked(&id, false).await;
                (id, result)
            });
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(err) => tracing::error!(error = %err, "refresh task failed"),
            }
        }
        results
    }

    /// Looks up `query` and starts tracking it on success.
    ///
    /// A name that is already tracked (ignoring case) keeps its existing entry
    /// and is refreshed through [`Dashboard::refresh_city`], so it shares the
    /// one-fetch-per-city rule.
    pub async fn add_city(&self, query: &str) -> Result<AddOutcome, WeatherError> {
        let name = query.trim();
        if name.is_empty() {
            return Err(WeatherError::EmptyQuery);
        }

        let tracked = self.inner.state.lock().find_by_name(name).map(|c| c.id.clone());
        if let Some(existing) = tracked {
            let outcome = self.refresh_city(&existing).await?;
            tracing::debug!(city = %existing, ?outcome, "city already tracked");
            return Ok(AddOutcome::AlreadyTracked(existing));
        }

        let _search = SearchGuard::start(&self.inner.searches);
        self.inner.state.lock().clear_error();

        let outcome = self.fetch_or_report(&CityQuery::new(name, None)).await?;

        let mut state = self.inner.state.lock();
        // Another search may have added the same name while this one ran.
        if let Some(existing) = state.find_by_name(name).map(|c| c.id.clone()) {
            tracing::debug!(city = %existing, "city added concurrently");
            return Ok(AddOutcome::AlreadyTracked(existing));
        }

        let city = TrackedCity::new(CityId::generate(name, Utc::now()), name, None);
        let id = city.id.clone();
        state.insert_city(city);
        state.record_reading(&id, reading_from(outcome));
        state.clear_error();

        tracing::info!(city = %id, name, "city added");
        Ok(AddOutcome::Added(id))
    }

    /// Stops tracking a city. Returns whether it was tracked.
    pub fn remove_city(&self, id: &CityId) -> bool {
        let removed = self.inner.state.lock().remove_city(id);
        if let Some(city) = &removed {
            tracing::info!(city = %id, name = %city.name, "city removed");
        }
        removed.is_some()
    }

    /// Refreshes all cities every `period` until the returned handle is
    /// stopped or dropped. The first tick fires one period from now.
    pub fn spawn_auto_refresh(&self, period: Duration) -> AutoRefresh {
        let period = period.max(Duration::from_millis(1));
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let dashboard = self.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        tracing::debug!("auto-refresh tick");
                        dashboard.refresh_all().await;
                    }
                }
            }
            tracing::debug!("auto-refresh stopped");
        });

        AutoRefresh { token, handle: Some(handle) }
    }

    async fn fetch_or_report(&self, query: &CityQuery) -> Result<FetchOutcome, WeatherError> {
        self.inner.fetcher.fetch(query).await.inspect_err(|err| {
            tracing::warn!(city = %query.name, error = %err, "weather fetch failed");
            self.inner.state.lock().set_error(err.to_string());
        })
    }
}

fn reading_from(outcome: FetchOutcome) -> Reading {
    Reading { record: outcome.record, source: outcome.source, updated_at: Utc::now() }
}

/// Handle to the periodic refresh task; cancels it when dropped.
#[derive(Debug)]
pub struct AutoRefresh {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl AutoRefresh {
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancels the loop and waits for an in-progress refresh to finish.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "auto-refresh task failed");
            }
        }
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
