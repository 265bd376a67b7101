use crate::errors::AppError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Sort key used for any time string that cannot be placed on the clock.
pub const SENTINEL_MINUTES: u16 = 1440;
pub const SENTINEL_DISPLAY: &str = "-";

/// Field names attached to a record by time enrichment.
pub const DISPLAY_TIME_FIELD: &str = "displayTime";
pub const SORT_MINUTES_FIELD: &str = "sortMinutes";

/// One race, entry or watchlist item as delivered by a feed.
///
/// Field presence varies per feed, so the record is kept as an ordered JSON
/// object and read through [`Record::text`] / [`Record::first_text`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Record(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// The field's value as a grouping key, or `None` when it is missing,
    /// `null`, `false` or an empty string.
    pub fn text(&self, field: &str) -> Option<String> {
        match self.0.get(field)? {
            Value::String(s) => {
                let t = s.trim();
                if t.is_empty() { None } else { Some(t.to_string()) }
            }
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(true) => Some("true".to_string()),
            _ => None,
        }
    }

    /// First present alias wins (`Horse`, then `Horse Name`, ...).
    pub fn first_text(&self, aliases: &[&str]) -> Option<String> {
        aliases.iter().find_map(|a| self.text(a))
    }

    /// Raw value of the first alias carrying something other than `null`.
    pub fn first_value(&self, aliases: &[&str]) -> Option<&Value> {
        aliases
            .iter()
            .filter_map(|a| self.0.get(*a))
            .find(|v| !v.is_null())
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Record(fields)
    }
}

/// A race time resolved to a display string and a minutes-since-midnight key.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NormalizedTime {
    #[serde(rename = "sortMinutes")]
    pub sort_minutes: u16,
    pub display: String,
}

impl NormalizedTime {
    pub fn new(display: impl Into<String>, sort_minutes: u16) -> Self {
        Self { display: display.into(), sort_minutes: sort_minutes.min(SENTINEL_MINUTES) }
    }

    pub fn sentinel() -> Self {
        Self { display: SENTINEL_DISPLAY.to_string(), sort_minutes: SENTINEL_MINUTES }
    }

    pub fn is_sentinel(&self) -> bool {
        self.sort_minutes == SENTINEL_MINUTES && self.display == SENTINEL_DISPLAY
    }
}

/// Which upstream feed produced a time string.
///
/// Only `Continental` changes parsing: it enables the `13h30` shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormatHint {
    #[default]
    Standard,
    Uk,
    Continental,
}

impl FromStr for SourceFormatHint {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(SourceFormatHint::Standard),
            "uk" => Ok(SourceFormatHint::Uk),
            "continental" | "fr" => Ok(SourceFormatHint::Continental),
            other => Err(AppError::Config(format!("unknown time format hint '{}'", other))),
        }
    }
}
