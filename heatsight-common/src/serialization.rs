use serde::{Serialize, de::DeserializeOwned};

use crate::error::{Error, Result};

/// Wire format for published readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// JSON (default, readable by any host tooling).
    #[default]
    Json,

    /// CBOR (compact binary).
    Cbor,
}

impl Format {
    /// MIME type announced alongside the payload.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Format::Json => "application/json",
            Format::Cbor => "application/cbor",
        }
    }

    /// Format announced by a MIME type, ignoring any `;` parameters.
    pub fn from_mime_type(mime: &str) -> Option<Format> {
        match mime.split(';').next().map(str::trim) {
            Some("application/json" | "text/json") => Some(Format::Json),
            Some("application/cbor") => Some(Format::Cbor),
            _ => None,
        }
    }
}

/// Encode a value to bytes using the specified format.
pub fn encode<T: Serialize>(value: &T, format: Format) -> Result<Vec<u8>> {
    match format {
        Format::Json => Ok(serde_json::to_vec(value)?),
        Format::Cbor => {
            let mut buf = Vec::new();
            ciborium::into_writer(value, &mut buf)?;
            Ok(buf)
        }
    }
}

/// Decode bytes to a value using the specified format.
pub fn decode<T: DeserializeOwned>(data: &[u8], format: Format) -> Result<T> {
    match format {
        Format::Json => Ok(serde_json::from_slice(data)?),
        Format::Cbor => {
            let mut rest = data;
            let value =
                ciborium::from_reader(&mut rest).map_err(|e| Error::Cbor(e.to_string()))?;
            if !rest.is_empty() {
                return Err(Error::Cbor(format!("{} trailing bytes", rest.len())));
            }
            Ok(value)
        }
    }
}

/// Decode bytes of unknown format: JSON first, then CBOR.
///
/// Both decoders reject trailing data, so a payload is only accepted whole.
pub fn decode_auto<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    decode(data, Format::Json).or_else(|_| decode(data, Format::Cbor))
}
