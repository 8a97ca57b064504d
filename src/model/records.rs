//! Leader and asset records produced by model extraction
//!
//! Model output is loose JSON. Conversion into these types is where it gets
//! validated: missing names drop the record, list fields keep only strings,
//! statuses collapse onto a closed enumeration and coordinates outside the
//! valid range become absent.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A record type that can be built from one loosely-typed JSON object
pub trait ExtractedRecord: Sized + Send + 'static {
    /// Key a model may wrap its array under (`{"leaders": [...]}`)
    const COLLECTION_KEY: &'static str;

    /// Builds a normalized record, or `None` if the value is unusable
    fn from_value(value: &Value) -> Option<Self>;

    /// Converts every usable value, silently skipping the rest
    fn from_values(values: &[Value]) -> Vec<Self> {
        let records: Vec<Self> = values.iter().filter_map(Self::from_value).collect();
        if records.len() < values.len() {
            tracing::debug!(
                "Dropped {} unusable {} record(s)",
                values.len() - records.len(),
                Self::COLLECTION_KEY
            );
        }
        records
    }
}

/// A person on the company's leadership team or board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderRecord {
    pub name: String,
    pub title: Option<String>,
    pub expertise_tags: Vec<String>,
    pub summary_bullets: Vec<String>,
}

/// A mine, project or operation owned by the company
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub name: String,
    pub commodities: Vec<String>,
    pub status: AssetStatus,
    pub country: Option<String>,
    pub state_province: Option<String>,
    pub town: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Operational status of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Operating,
    Developing,
    Exploration,
    Closed,
    CareAndMaintenance,
    Unknown,
}

impl AssetStatus {
    /// Maps free-form model output onto the closed status set
    ///
    /// Exact names win; otherwise the first matching keyword rule applies and
    /// anything unrecognized becomes `Unknown`.
    pub fn normalize(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::Unknown;
        };
        let lower = raw
            .trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_");

        if let Some(exact) = Self::from_db_string(&lower) {
            return exact;
        }

        if lower.contains("operat") {
            Self::Operating
        } else if lower.contains("develop") || lower.contains("construct") {
            Self::Developing
        } else if lower.contains("explor") {
            Self::Exploration
        } else if lower.contains("clos") || lower.contains("shut") {
            Self::Closed
        } else if lower.contains("care") || lower.contains("maintenance") {
            Self::CareAndMaintenance
        } else {
            Self::Unknown
        }
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Operating => "operating",
            Self::Developing => "developing",
            Self::Exploration => "exploration",
            Self::Closed => "closed",
            Self::CareAndMaintenance => "care_and_maintenance",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "operating" => Some(Self::Operating),
            "developing" => Some(Self::Developing),
            "exploration" => Some(Self::Exploration),
            "closed" => Some(Self::Closed),
            "care_and_maintenance" => Some(Self::CareAndMaintenance),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

impl ExtractedRecord for LeaderRecord {
    const COLLECTION_KEY: &'static str = "leaders";

    fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let name = non_empty_string(object.get("name"))?;

        Some(Self {
            name,
            title: non_empty_string(object.get("title")),
            expertise_tags: string_list(object.get("expertise_tags")),
            summary_bullets: string_list(object.get("summary_bullets")),
        })
    }
}

impl ExtractedRecord for AssetRecord {
    const COLLECTION_KEY: &'static str = "assets";

    fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let name = non_empty_string(object.get("name"))?;

        Some(Self {
            name,
            commodities: string_list(object.get("commodities")),
            status: AssetStatus::normalize(object.get("status").and_then(Value::as_str)),
            country: non_empty_string(object.get("country")),
            state_province: non_empty_string(object.get("state_province")),
            town: non_empty_string(object.get("town")),
            latitude: bounded_coordinate(object.get("latitude"), -90.0, 90.0),
            longitude: bounded_coordinate(object.get("longitude"), -180.0, 180.0),
        })
    }
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    let s = value?.as_str()?.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        // A lone string is a one-item list
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

/// Reads a coordinate from a number or numeric string, dropping out-of-range values
pub fn bounded_coordinate(value: Option<&Value>, min: f64, max: f64) -> Option<f64> {
    let number = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    (number.is_finite() && number >= min && number <= max).then_some(number)
}
