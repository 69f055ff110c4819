//! Scripted transport shared by the behavior tests.
//!
//! Requests are routed by their `facets[fueltype][]` code. Each route plays
//! its steps in order and repeats the last one forever.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gridtick_core::{
    AcquisitionConfig, FetchOrchestrator, HttpClient, HttpError, HttpRequest, HttpResponse,
};
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub enum Step {
    Respond(HttpResponse),
    Fail(HttpError),
    /// Never completes; only the caller's timeout ends it.
    Hang,
}

impl Step {
    pub fn ok(body: impl Into<String>) -> Self {
        Self::Respond(HttpResponse::ok_json(body))
    }

    pub fn status(status: u16) -> Self {
        Self::Respond(HttpResponse::new(status, ""))
    }
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub fuel: String,
    pub at: Instant,
    pub timeout: Duration,
    pub request: HttpRequest,
}

#[derive(Debug, Default)]
struct Route {
    steps: VecDeque<Step>,
    last: Option<Step>,
}

impl Route {
    fn next(&mut self) -> Step {
        if let Some(step) = self.steps.pop_front() {
            self.last = Some(step.clone());
            return step;
        }
        self.last
            .clone()
            .unwrap_or_else(|| Step::Fail(HttpError::connect("no scripted response")))
    }
}

#[derive(Debug, Default)]
pub struct ScriptedHttpClient {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedHttpClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Appends `steps` to the script for the given EIA fuel code (SUN, WND, COL, NG).
    pub fn script(&self, fuel: &str, steps: impl IntoIterator<Item = Step>) {
        let mut routes = self.routes.lock().expect("routes lock is not poisoned");
        routes
            .entry(fuel.to_owned())
            .or_default()
            .steps
            .extend(steps);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("calls lock is not poisoned").clone()
    }

    pub fn calls_for(&self, fuel: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.fuel == fuel)
            .collect()
    }

    /// Gaps between consecutive calls for one fuel.
    pub fn gaps_for(&self, fuel: &str) -> Vec<Duration> {
        self.calls_for(fuel)
            .windows(2)
            .map(|pair| pair[1].at.duration_since(pair[0].at))
            .collect()
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let fuel = request
                .query_value("facets[fueltype][]")
                .unwrap_or_default()
                .to_owned();
            self.calls
                .lock()
                .expect("calls lock is not poisoned")
                .push(RecordedCall {
                    fuel: fuel.clone(),
                    at: Instant::now(),
                    timeout: request.timeout,
                    request,
                });

            let step = self
                .routes
                .lock()
                .expect("routes lock is not poisoned")
                .entry(fuel)
                .or_default()
                .next();

            match step {
                Step::Respond(response) => Ok(response),
                Step::Fail(error) => Err(error),
                Step::Hang => std::future::pending().await,
            }
        })
    }
}

/// EIA-shaped payload with the given `(period, value)` rows, newest first.
pub fn eia_body(fuel: &str, rows: &[(&str, f64)]) -> String {
    let data = rows
        .iter()
        .map(|(period, value)| {
            serde_json::json!({
                "period": period,
                "respondent": "US48",
                "fueltype": fuel,
                "value": value.to_string(),
                "value-units": "megawatthours",
            })
        })
        .collect::<Vec<_>>();

    serde_json::json!({ "response": { "total": data.len(), "data": data } }).to_string()
}

/// Single-row payload whose mean is `value`.
pub fn eia_value(fuel: &str, value: f64) -> String {
    eia_body(fuel, &[("2025-01-01T00", value)])
}

pub fn test_config() -> AcquisitionConfig {
    AcquisitionConfig {
        requests_per_minute: 0,
        ..AcquisitionConfig::default()
    }
    .with_api_key("test-key")
}

pub fn orchestrator_with(
    http_client: &Arc<ScriptedHttpClient>,
    config: AcquisitionConfig,
) -> FetchOrchestrator {
    FetchOrchestrator::builder()
        .with_config(config)
        .with_http_client(Arc::clone(http_client) as Arc<dyn HttpClient>)
        .build()
        .expect("test config is valid")
}

pub fn orchestrator(http_client: &Arc<ScriptedHttpClient>) -> FetchOrchestrator {
    orchestrator_with(http_client, test_config())
}
