pub mod csv;
pub mod normalize;
pub mod orchestrator;
pub mod prompt;

pub use orchestrator::research_report;

use serde::{Deserialize, Serialize};

/// Target regions the form can select. Serialized names are the
/// user-facing display strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    #[serde(rename = "Middle East Ports")]
    MiddleEastPorts,
    #[serde(rename = "African Ports")]
    AfricanPorts,
    #[serde(rename = "Southeast Asia")]
    SoutheastAsia,
    #[serde(rename = "Mediterranean Sea")]
    MediterraneanSea,
    Europe,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::MiddleEastPorts => "Middle East Ports",
            Region::AfricanPorts => "African Ports",
            Region::SoutheastAsia => "Southeast Asia",
            Region::MediterraneanSea => "Mediterranean Sea",
            Region::Europe => "Europe",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Industry {
    #[serde(rename = "General Chemicals")]
    GeneralChemicals,
    #[serde(rename = "Drilling Chemicals")]
    DrillingChemicals,
    #[serde(rename = "Plastic Products")]
    PlasticProducts,
}

impl Industry {
    pub fn as_str(&self) -> &'static str {
        match self {
            Industry::GeneralChemicals => "General Chemicals",
            Industry::DrillingChemicals => "Drilling Chemicals",
            Industry::PlasticProducts => "Plastic Products",
        }
    }
}

/// Qualitative thoroughness knob passed through to the prompt; the
/// acquirer does not enforce it separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResearchDepth {
    Quick,
    #[default]
    Standard,
    Comprehensive,
}

impl ResearchDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResearchDepth::Quick => "Quick",
            ResearchDepth::Standard => "Standard",
            ResearchDepth::Comprehensive => "Comprehensive",
        }
    }
}

/// One research submission, immutable once accepted at the boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct ResearchConfig {
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub context: String,
    pub regions: Vec<Region>,
    pub industries: Vec<Industry>,
    #[serde(default)]
    pub depth: ResearchDepth,
}
