//! Upstream market-data records.
//!
//! The upstream API is loose about types: prices and volumes arrive as JSON
//! numbers or as strings, integers sometimes carry a fractional part, and
//! dates may or may not include a time of day. The deserializers below accept
//! all of those shapes.

use chrono::NaiveDate;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

/// One entry of the realtime stock list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockRealtimeInfo {
    pub code: String,
    #[serde(default)]
    pub name: String,
    /// Total market capitalisation.
    #[serde(rename = "mktcap", default, deserialize_with = "lenient_f64")]
    pub market_cap: f64,
    #[serde(rename = "trade", default, deserialize_with = "lenient_f64")]
    pub current_price: f64,
    #[serde(rename = "open", default, deserialize_with = "lenient_f64")]
    pub open_price: f64,
    /// Previous trading day's close.
    #[serde(rename = "settlement", default, deserialize_with = "lenient_f64")]
    pub settlement_price: f64,
    #[serde(rename = "high", default, deserialize_with = "lenient_f64")]
    pub highest_price: f64,
    #[serde(rename = "low", default, deserialize_with = "lenient_f64")]
    pub lowest_price: f64,
    #[serde(rename = "changepercent", default, deserialize_with = "lenient_f64")]
    pub change_percent: f64,
    #[serde(rename = "turnoverratio", default, deserialize_with = "lenient_f64")]
    pub turnover_ratio: f64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub volume: i64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: f64,
}

/// One day of trading statistics for a stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockDailyStatisticsInfo {
    #[serde(default)]
    pub code: String,
    #[serde(rename = "open", default, deserialize_with = "lenient_f64")]
    pub open_price: f64,
    #[serde(rename = "close", default, deserialize_with = "lenient_f64")]
    pub close_price: f64,
    #[serde(rename = "high", default, deserialize_with = "lenient_f64")]
    pub highest_price: f64,
    #[serde(rename = "low", default, deserialize_with = "lenient_f64")]
    pub lowest_price: f64,
    #[serde(deserialize_with = "lenient_date")]
    pub date: NaiveDate,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub volume: i64,
}

struct LenientF64;

impl<'de> Visitor<'de> for LenientF64 {
    type Value = f64;

    fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("a number or a numeric string")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
        Ok(v as f64)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
        let v = v.trim();
        if v.is_empty() || v == "-" {
            return Ok(0.0);
        }
        v.parse().map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
    }

    fn visit_unit<E: de::Error>(self) -> Result<f64, E> {
        Ok(0.0)
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    deserializer.deserialize_any(LenientF64)
}

// Integers arrive as floats ("1234.0") often enough that truncation is the norm.
fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    deserializer.deserialize_any(LenientF64).map(|v| v as i64)
}

fn lenient_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| de::Error::custom(format!("unrecognised date '{raw}'")))
}

/// Parse `2024-05-06`, `2024-05-06 15:00:00` or `2024-05-06T15:00:00`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().split([' ', 'T']).next()?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}
