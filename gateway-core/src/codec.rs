//! Wire formats (JSON / XML)
//!
//! Gateways declare one of two interchangeable formats. The same codec is used
//! for inbound requests, outbound responses, provider calls and notification
//! payloads.

use crate::{Error, Result};
use rust_decimal::Decimal;
use serde::de::{self, DeserializeOwned, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported data format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataFormat {
    /// application/json
    #[serde(rename = "application/json")]
    Json,
    /// application/xml (SOAP-style gateways)
    #[serde(rename = "application/xml", alias = "text/xml")]
    Xml,
}

impl DataFormat {
    /// Resolve a Content-Type/Accept header value. Missing or empty means JSON.
    pub fn from_content_type(content_type: Option<&str>) -> Result<Self> {
        let media_type = content_type
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_ascii_lowercase())
            .unwrap_or_default();

        match media_type.as_str() {
            "" | "application/json" => Ok(DataFormat::Json),
            "application/xml" | "text/xml" => Ok(DataFormat::Xml),
            other => Err(Error::Codec(format!("unsupported content type: {}", other))),
        }
    }

    /// Canonical content type
    pub const fn content_type(self) -> &'static str {
        match self {
            DataFormat::Json => "application/json",
            DataFormat::Xml => "application/xml",
        }
    }

    /// Notification topic for transactions in this format
    pub const fn topic(self) -> &'static str {
        match self {
            DataFormat::Json => "transactions.json",
            DataFormat::Xml => "transactions.soap",
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.content_type())
    }
}

/// Encode a value in the given format
pub fn encode<T: Serialize>(format: DataFormat, value: &T) -> Result<Vec<u8>> {
    match format {
        DataFormat::Json => Ok(serde_json::to_vec(value)?),
        DataFormat::Xml => quick_xml::se::to_string(value)
            .map(String::into_bytes)
            .map_err(|e| Error::Codec(format!("XML encode failed: {}", e))),
    }
}

/// Decode a value from the given format
pub fn decode<T: DeserializeOwned>(format: DataFormat, body: &[u8]) -> Result<T> {
    match format {
        DataFormat::Json => serde_json::from_slice(body)
            .map_err(|e| Error::Codec(format!("JSON decode failed: {}", e))),
        DataFormat::Xml => {
            let text = std::str::from_utf8(body)
                .map_err(|e| Error::Codec(format!("XML body is not UTF-8: {}", e)))?;
            quick_xml::de::from_str(text)
                .map_err(|e| Error::Codec(format!("XML decode failed: {}", e)))
        }
    }
}

/// Decimal from a string or a number, in either wire format.
///
/// quick-xml presents element content to `deserialize_any` as a map with a
/// single `$text` entry, which the stock `Decimal` impl rejects.
pub fn deserialize_decimal<'de, D>(deserializer: D) -> std::result::Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(DecimalVisitor)
}

struct DecimalVisitor;

impl<'de> Visitor<'de> for DecimalVisitor {
    type Value = Decimal;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a decimal number or numeric string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Decimal, E> {
        let v = v.trim();
        Decimal::from_str(v)
            .or_else(|_| Decimal::from_scientific(v))
            .map_err(|_| E::custom(format!("invalid decimal: {}", v)))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Decimal, E> {
        Ok(Decimal::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Decimal, E> {
        Ok(Decimal::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Decimal, E> {
        // shortest round-trip text, so 100.5 stays 100.5
        self.visit_str(&v.to_string())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Decimal, A::Error> {
        let mut text = None;
        while let Some(key) = map.next_key::<String>()? {
            if key == "$text" || key == "$value" {
                text = Some(map.next_value::<String>()?);
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        let text = text.ok_or_else(|| de::Error::custom("decimal element has no text"))?;
        self.visit_str(&text)
    }
}
