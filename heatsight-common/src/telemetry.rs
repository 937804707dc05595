use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// A decoded point value published by a bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum PointValue {
    /// Temperature in degrees Celsius (half-degree resolution on the wire).
    Celsius(f64),

    /// Duration in whole minutes.
    Minutes(u32),
}

impl PointValue {
    /// Physical kind of this value.
    pub fn kind(&self) -> PointKind {
        match self {
            PointValue::Celsius(_) => PointKind::Temperature,
            PointValue::Minutes(_) => PointKind::Duration,
        }
    }

    /// Numeric view of the value, as shown to an operator.
    pub fn as_f64(&self) -> f64 {
        match self {
            PointValue::Celsius(c) => *c,
            PointValue::Minutes(m) => f64::from(*m),
        }
    }
}

impl std::fmt::Display for PointValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PointValue::Celsius(c) => write!(f, "{c}"),
            PointValue::Minutes(m) => write!(f, "{m}"),
        }
    }
}

/// Physical quantity carried by a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointKind {
    Temperature,
    Duration,
}

impl PointKind {
    /// Default display unit for this kind.
    pub fn unit(&self) -> &'static str {
        match self {
            PointKind::Temperature => "°C",
            PointKind::Duration => "min.",
        }
    }
}

/// A single reading emitted after a successful decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointReading {
    /// Unix epoch milliseconds when the register block was read.
    pub timestamp: i64,

    /// Device identifier (e.g., "eq2021").
    pub source: String,

    /// Point name (e.g., "TEMP_AIR_IN").
    pub point: String,

    /// The decoded value.
    pub value: PointValue,

    /// Additional context labels (e.g., register address, unit).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
}

impl PointReading {
    /// Create a new reading stamped with the current time.
    pub fn new(source: impl Into<String>, point: impl Into<String>, value: PointValue) -> Self {
        Self {
            timestamp: current_timestamp_millis(),
            source: source.into(),
            point: point.into(),
            value,
            labels: HashMap::new(),
        }
    }

    /// Add a label to this reading.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }
}

/// Get the current timestamp in milliseconds since Unix epoch.
///
/// Returns 0 if the system clock is before the epoch.
pub fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
