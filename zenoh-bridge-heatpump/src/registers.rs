//! Static register map of the Emmeti Mirai EQ2021 hot-water heat pump.
//!
//! Points are grouped into two read blocks fetched with one exchange each:
//! the measurement block (2019..=2023, read-only) and the setpoint block
//! (1104..=1109). On this device family every address at or above 2000 is
//! read-only.

use serde::Serialize;

use crate::codec::Encoding;
use crate::lang::Language;
use crate::registry::PointDescriptor;

/// First read-only address on EQ-series controllers.
pub const READ_ONLY_BASE: u16 = 2000;

/// A contiguous run of registers fetched in one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadBlock {
    pub name: &'static str,
    pub base: u16,
    pub count: u16,
}

/// Measurements: air in, tank bottom, tank top, coil, air out.
pub const PRIMARY_BLOCK: ReadBlock = ReadBlock {
    name: "measurements",
    base: 2019,
    count: 5,
};

/// Setpoints: hot water, differential, resistor delay (1105, 1107, 1108 unused).
pub const SECONDARY_BLOCK: ReadBlock = ReadBlock {
    name: "setpoints",
    base: 1104,
    count: 6,
};

impl ReadBlock {
    /// Whether `address` lies inside this block.
    pub fn contains(&self, address: u16) -> bool {
        address >= self.base && u32::from(address) < u32::from(self.base) + u32::from(self.count)
    }

    /// Points fetched by this block, in table order.
    pub fn points(&self) -> impl Iterator<Item = &'static RegisterPoint> + use<> {
        let block = *self;
        POINTS.iter().filter(move |p| p.block == block)
    }

    /// Raw value of `point` inside a fetched block.
    pub fn value_at(&self, values: &[u16], point: &RegisterPoint) -> Option<u16> {
        if !self.contains(point.address) {
            return None;
        }
        values.get(usize::from(point.address - self.base)).copied()
    }
}

/// Read/write capability of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    ReadOnly,
    ReadWrite,
}

impl AccessMode {
    /// Access mode implied by the device-family address convention.
    pub const fn for_address(address: u16) -> Self {
        if address >= READ_ONLY_BASE {
            AccessMode::ReadOnly
        } else {
            AccessMode::ReadWrite
        }
    }
}

/// Host-side presentation hints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Presentation {
    pub unit: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Presentation {
    const fn reading(unit: &'static str) -> Self {
        Self {
            unit,
            step: None,
            min: None,
            max: None,
        }
    }

    const fn setpoint(unit: &'static str, step: f64, min: f64, max: f64) -> Self {
        Self {
            unit,
            step: Some(step),
            min: Some(min),
            max: Some(max),
        }
    }
}

/// One named register on the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegisterPoint {
    pub name: &'static str,
    pub address: u16,
    pub access: AccessMode,
    pub encoding: Encoding,
    pub block: ReadBlock,
    pub presentation: Presentation,
    /// Labels indexed like [`Language::ALL`].
    labels: [&'static str; 2],
}

impl RegisterPoint {
    /// Whether host writes are forwarded to the device.
    pub fn is_writable(&self) -> bool {
        self.access == AccessMode::ReadWrite
    }

    /// Human-readable label in `lang`.
    pub fn label(&self, lang: Language) -> &'static str {
        match lang {
            Language::En => self.labels[0],
            Language::It => self.labels[1],
        }
    }

    /// Descriptor announced to the host at startup.
    pub fn descriptor(&self, lang: Language) -> PointDescriptor {
        PointDescriptor {
            name: self.name,
            label: self.label(lang),
            kind: match self.encoding {
                Encoding::Temperature => heatsight_common::PointKind::Temperature,
                Encoding::Duration => heatsight_common::PointKind::Duration,
            },
            writable: self.is_writable(),
            address: self.address,
            presentation: self.presentation,
        }
    }
}

const fn point(
    name: &'static str,
    address: u16,
    encoding: Encoding,
    block: ReadBlock,
    presentation: Presentation,
    labels: [&'static str; 2],
) -> RegisterPoint {
    RegisterPoint {
        name,
        address,
        access: AccessMode::for_address(address),
        encoding,
        block,
        presentation,
        labels,
    }
}

/// Every point exposed by the bridge.
pub static POINTS: [RegisterPoint; 8] = [
    point(
        "SP_HOTWATER",
        1104,
        Encoding::Temperature,
        SECONDARY_BLOCK,
        Presentation::setpoint("°C", 0.5, 10.0, 60.0),
        ["SetPoint Hot Water", "Termostato ACS"],
    ),
    point(
        "SP_DIFF",
        1106,
        Encoding::Temperature,
        SECONDARY_BLOCK,
        Presentation::setpoint("°C", 0.5, 1.0, 20.0),
        [
            "SetPoint-TempLow to activate",
            "SetPoint-TempLow per attivare",
        ],
    ),
    point(
        "SP_RESISTOR_DELAY",
        1109,
        Encoding::Duration,
        SECONDARY_BLOCK,
        Presentation::setpoint("min.", 5.0, 0.0, 450.0),
        ["Resistor start delay", "Ritardo acc. resistenza"],
    ),
    point(
        "TEMP_WATER_BOTTOM",
        2020,
        Encoding::Temperature,
        PRIMARY_BLOCK,
        Presentation::reading("°C"),
        ["Temp tank bottom", "Temp bollitore in basso"],
    ),
    point(
        "TEMP_WATER_TOP",
        2021,
        Encoding::Temperature,
        PRIMARY_BLOCK,
        Presentation::reading("°C"),
        ["Temp tank top", "Temp bollitore in alto"],
    ),
    point(
        "TEMP_AIR_IN",
        2019,
        Encoding::Temperature,
        PRIMARY_BLOCK,
        Presentation::reading("°C"),
        ["Temp air inlet", "Temp aria ingresso"],
    ),
    point(
        "TEMP_AIR_OUT",
        2023,
        Encoding::Temperature,
        PRIMARY_BLOCK,
        Presentation::reading("°C"),
        ["Temp air outlet", "Temp aria uscita"],
    ),
    point(
        "TEMP_COIL",
        2022,
        Encoding::Temperature,
        PRIMARY_BLOCK,
        Presentation::reading("°C"),
        ["Temp coil", "Temp scambiatore"],
    ),
];

/// Look up a point by name.
pub fn find_point(name: &str) -> Option<&'static RegisterPoint> {
    POINTS.iter().find(|p| p.name == name)
}
