//! In-process provider for exercising the fetcher and dashboard.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::sync::Notify;

use crate::{CityQuery, WeatherError, WeatherProvider, WeatherRecord};

#[derive(Debug, Clone)]
pub(crate) enum Scripted {
    Live(WeatherRecord),
    Fail(WeatherError),
}

/// Answers by query string; unknown queries fail with a transport error.
#[derive(Debug, Default)]
pub(crate) struct ScriptedProvider {
    responses: Mutex<HashMap<String, Scripted>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(self, query: &str, response: Scripted) -> Self {
        self.responses.lock().insert(query.to_string(), response);
        self
    }

    /// Holds requests for `query` until the returned gate is notified.
    pub(crate) fn gate(&self, query: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().insert(query.to_string(), gate.clone());
        gate
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for ScriptedProvider {
    async fn current_weather(&self, query: &CityQuery) -> Result<WeatherRecord, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = query.to_query_string();

        let gate = self.gates.lock().get(&key).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match self.responses.lock().get(&key).cloned() {
            Some(Scripted::Live(record)) => Ok(record),
            Some(Scripted::Fail(err)) => Err(err),
            None => Err(WeatherError::Transport(format!("no route to {key}"))),
        }
    }
}

pub(crate) fn live_record(condition: &str) -> WeatherRecord {
    WeatherRecord {
        temperature_c: 12.3,
        feels_like_c: 11.0,
        condition: condition.to_string(),
        icon_code: Some("04d".into()),
        humidity_pct: 70,
        wind_speed_kmh: 15.0,
        visibility_km: 10.0,
    }
}
