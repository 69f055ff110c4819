//! Hourly analysis over the readings of one batch.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::orchestrator::FetchResult;
use crate::{EnergySource, HourlySample, Provenance, Reading};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSummary {
    pub source: EnergySource,
    pub provenance: Provenance,
    pub unit: String,
    pub average: f64,
    pub peak: Option<HourlySample>,
    pub low: Option<HourlySample>,
}

impl SourceSummary {
    pub fn from_reading(reading: &Reading) -> Self {
        let series = reading.series();
        Self {
            source: reading.source(),
            provenance: reading.provenance(),
            unit: reading.unit().to_owned(),
            average: reading.value(),
            peak: series
                .iter()
                .max_by(|left, right| left.value.total_cmp(&right.value))
                .cloned(),
            low: series
                .iter()
                .min_by(|left, right| left.value.total_cmp(&right.value))
                .cloned(),
        }
    }
}

/// Per-source statistics plus system totals summed across sources per period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationSummary {
    pub sources: Vec<SourceSummary>,
    /// Missing sources are absent from every total.
    pub missing: Vec<EnergySource>,
    pub total_average: Option<f64>,
    pub total_peak: Option<HourlySample>,
    pub total_low: Option<HourlySample>,
    /// `total_peak / total_average`; absent unless the average is positive.
    pub peak_to_average: Option<f64>,
}

impl GenerationSummary {
    pub fn from_result(result: &FetchResult) -> Self {
        let readings = result.available().collect::<Vec<_>>();

        let mut totals = BTreeMap::<&str, f64>::new();
        for sample in readings.iter().flat_map(|reading| reading.series()) {
            *totals.entry(sample.period.as_str()).or_default() += sample.value;
        }
        let total_samples = totals
            .into_iter()
            .map(|(period, value)| HourlySample {
                period: period.to_owned(),
                value,
            })
            .collect::<Vec<_>>();

        let total_average = (!total_samples.is_empty()).then(|| {
            total_samples.iter().map(|sample| sample.value).sum::<f64>() / total_samples.len() as f64
        });

        let total_peak = total_samples
            .iter()
            .max_by(|left, right| left.value.total_cmp(&right.value))
            .cloned();
        let peak_to_average = match (&total_peak, total_average) {
            (Some(peak), Some(average)) if average > 0.0 => Some(peak.value / average),
            _ => None,
        };

        Self {
            sources: readings.into_iter().map(SourceSummary::from_reading).collect(),
            missing: result.missing(),
            total_average,
            total_peak,
            total_low: total_samples
                .iter()
                .min_by(|left, right| left.value.total_cmp(&right.value))
                .cloned(),
            peak_to_average,
        }
    }
}
