use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Energy sources whose metered generation data can be acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergySource {
    Solar,
    Wind,
    Coal,
    NaturalGas,
    AiAnalysis,
}

impl EnergySource {
    pub const ALL: [Self; 5] = [
        Self::Solar,
        Self::Wind,
        Self::Coal,
        Self::NaturalGas,
        Self::AiAnalysis,
    ];

    /// Sources served by the metered-generation provider.
    pub const FUELS: [Self; 4] = [Self::Solar, Self::Wind, Self::Coal, Self::NaturalGas];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Solar => "solar",
            Self::Wind => "wind",
            Self::Coal => "coal",
            Self::NaturalGas => "natural_gas",
            Self::AiAnalysis => "ai_analysis",
        }
    }

    /// Human-facing label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Solar => "Solar",
            Self::Wind => "Wind",
            Self::Coal => "Coal",
            Self::NaturalGas => "Natural Gas",
            Self::AiAnalysis => "AI Analysis",
        }
    }

    pub const fn is_fuel(self) -> bool {
        !matches!(self, Self::AiAnalysis)
    }
}

impl Display for EnergySource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnergySource {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "solar" => Ok(Self::Solar),
            "wind" => Ok(Self::Wind),
            "coal" => Ok(Self::Coal),
            "natural_gas" | "gas" => Ok(Self::NaturalGas),
            "ai_analysis" | "analysis" => Ok(Self::AiAnalysis),
            _ => Err(ValidationError::InvalidSource {
                value: value.trim().to_owned(),
            }),
        }
    }
}
