//! Raw register <-> physical unit conversions for the EQ2021 family.
//!
//! Temperatures are stored as half-degree steps offset by 60 (raw 60 = 0 °C,
//! raw 160 = 50 °C). Durations are stored in 5-minute steps. Encoders truncate,
//! so sub-step precision is silently lost on write.

use heatsight_common::PointValue;
use serde::{Deserialize, Serialize};

/// Raw value that represents 0 °C.
const TEMPERATURE_ZERO: i64 = 60;

/// Minutes per raw duration step.
const DURATION_STEP_MINUTES: u32 = 5;

/// Decode a raw register into degrees Celsius. No range check is applied.
pub fn decode_temperature(raw: u16) -> f64 {
    (f64::from(raw) - TEMPERATURE_ZERO as f64) * 0.5
}

/// Encode degrees Celsius into a raw register.
///
/// `celsius * 2` is truncated toward zero before the offset is added; results
/// outside the register range saturate.
pub fn encode_temperature(celsius: f64) -> u16 {
    let steps = (celsius * 2.0).trunc() as i64;
    saturate(steps.saturating_add(TEMPERATURE_ZERO))
}

/// Decode a raw register into minutes.
pub fn decode_duration(raw: u16) -> u32 {
    u32::from(raw) * DURATION_STEP_MINUTES
}

/// Encode minutes into a raw register (truncating division by the step).
pub fn encode_duration(minutes: u32) -> u16 {
    saturate(i64::from(minutes / DURATION_STEP_MINUTES))
}

fn saturate(value: i64) -> u16 {
    value.clamp(0, i64::from(u16::MAX)) as u16
}

/// How a point's register is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    Temperature,
    Duration,
}

impl Encoding {
    /// Decode a raw register into a typed value.
    pub fn decode(&self, raw: u16) -> PointValue {
        match self {
            Encoding::Temperature => PointValue::Celsius(decode_temperature(raw)),
            Encoding::Duration => PointValue::Minutes(decode_duration(raw)),
        }
    }

    /// Encode a host-requested level into a raw register.
    ///
    /// Duration levels are truncated to whole minutes first; negative levels become 0.
    pub fn encode(&self, level: f64) -> u16 {
        match self {
            Encoding::Temperature => encode_temperature(level),
            Encoding::Duration => encode_duration(level as u32),
        }
    }

    /// The value a host should display after requesting `level`.
    pub fn requested_value(&self, level: f64) -> PointValue {
        match self {
            Encoding::Temperature => PointValue::Celsius(level),
            Encoding::Duration => PointValue::Minutes(level as u32),
        }
    }
}
