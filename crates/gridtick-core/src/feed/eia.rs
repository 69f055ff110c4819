use std::sync::Arc;

use serde::Deserialize;

use crate::feed::{FeedFuture, PaceFuture, ReadingFeed};
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::retry::Attempt;
use crate::throttling::RequestThrottle;
use crate::{EnergySource, FetchError, HourlySample, Reading, SeriesQuery};

pub const EIA_DEFAULT_ENDPOINT: &str = "https://api.eia.gov/v2/electricity/rto/generation-type/data";

const DEFAULT_UNIT: &str = "megawatthours";

/// Hourly generation-by-fuel feed for the EIA electricity/RTO endpoint.
#[derive(Clone)]
pub struct EiaFeed {
    http_client: Arc<dyn HttpClient>,
    endpoint: String,
    auth: HttpAuth,
    throttle: Option<RequestThrottle>,
}

impl EiaFeed {
    pub fn new(http_client: Arc<dyn HttpClient>, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            endpoint: String::from(EIA_DEFAULT_ENDPOINT),
            auth: HttpAuth::QueryParam {
                name: String::from("api_key"),
                value: api_key.into(),
            },
            throttle: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_throttle(mut self, throttle: RequestThrottle) -> Self {
        self.throttle = Some(throttle);
        self
    }

    /// EIA `fueltype` facet code.
    pub const fn fuel_code(source: EnergySource) -> Option<&'static str> {
        match source {
            EnergySource::Solar => Some("SUN"),
            EnergySource::Wind => Some("WND"),
            EnergySource::Coal => Some("COL"),
            EnergySource::NaturalGas => Some("NG"),
            EnergySource::AiAnalysis => None,
        }
    }

    pub fn build_request(
        &self,
        source: EnergySource,
        query: SeriesQuery,
        attempt: Attempt,
    ) -> Result<HttpRequest, FetchError> {
        let fuel = Self::fuel_code(source).ok_or_else(|| {
            FetchError::malformed_request(format!("eia feed does not serve source '{source}'"))
        })?;

        Ok(HttpRequest::get(self.endpoint.as_str())
            .with_query("frequency", query.frequency.as_str())
            .with_query("data[0]", "value")
            .with_query("facets[fueltype][]", fuel)
            .with_query("sort[0][column]", "period")
            .with_query("sort[0][direction]", "desc")
            .with_query("length", query.length.to_string())
            .with_auth(&self.auth)
            .with_header("accept", "application/json")
            .with_timeout(attempt.timeout))
    }
}

impl ReadingFeed for EiaFeed {
    fn name(&self) -> &'static str {
        "eia"
    }

    fn sources(&self) -> Vec<EnergySource> {
        EnergySource::FUELS.to_vec()
    }

    fn pace(&self) -> PaceFuture<'_> {
        Box::pin(async move {
            if let Some(throttle) = &self.throttle {
                throttle.acquire().await;
            }
        })
    }

    fn fetch(&self, source: EnergySource, query: SeriesQuery, attempt: Attempt) -> FeedFuture<'_> {
        Box::pin(async move {
            let request = self.build_request(source, query, attempt)?;
            let response = self.http_client.execute(request).await?;
            if let Some(error) = FetchError::from_status(response.status, response.retry_after()) {
                return Err(error);
            }

            parse_generation(source, &response.body)
        })
    }
}

#[derive(Debug, Deserialize)]
struct EiaEnvelope {
    response: Option<EiaResponse>,
}

#[derive(Debug, Deserialize)]
struct EiaResponse {
    #[serde(default)]
    data: Vec<EiaRow>,
}

#[derive(Debug, Deserialize)]
struct EiaRow {
    period: String,
    value: Option<EiaValue>,
    #[serde(rename = "value-units")]
    units: Option<String>,
}

/// EIA serves values as numbers or numeric strings depending on the route.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EiaValue {
    Number(f64),
    Text(String),
}

impl EiaValue {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => text.trim().parse().ok(),
        }
        .filter(|value: &f64| value.is_finite())
    }
}

/// Normalizes a generation payload into a reading whose value is the series mean.
fn parse_generation(source: EnergySource, body: &str) -> Result<Reading, FetchError> {
    let envelope: EiaEnvelope = serde_json::from_str(body).map_err(|error| {
        FetchError::malformed_response(format!("eia payload is not valid json: {error}"))
    })?;
    let rows = envelope
        .response
        .map(|response| response.data)
        .unwrap_or_default();

    let unit = rows
        .iter()
        .find_map(|row| row.units.clone())
        .unwrap_or_else(|| String::from(DEFAULT_UNIT));
    let series = rows
        .into_iter()
        .filter_map(|row| {
            let value = row.value.as_ref()?.as_f64()?;
            Some(HourlySample {
                period: row.period,
                value,
            })
        })
        .collect::<Vec<_>>();

    if series.is_empty() {
        return Err(FetchError::malformed_response(
            "eia payload contained no usable data rows",
        ));
    }

    let mean = series.iter().map(|sample| sample.value).sum::<f64>() / series.len() as f64;
    Reading::live(source, mean, unit, series)
        .map_err(|error| FetchError::malformed_response(error.to_string()))
}
