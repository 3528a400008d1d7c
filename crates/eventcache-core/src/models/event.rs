use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Server-assigned event identifier.
///
/// The backend hands out either strings or numbers; both are kept as text so
/// the id can be used verbatim in cache keys and URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EventId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl<'de> Deserialize<'de> for EventId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Number(n) => Self(n.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Event {
    pub id: EventId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub image: String,
}

/// Everything about an event except its id. Sent when creating an event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct EventFields {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub image: String,
}

/// Partial update. Absent fields keep their stored value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct EventPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl From<EventFields> for EventPatch {
    fn from(fields: EventFields) -> Self {
        Self {
            title: Some(fields.title),
            description: Some(fields.description),
            date: Some(fields.date),
            time: Some(fields.time),
            location: Some(fields.location),
            image: Some(fields.image),
        }
    }
}

impl Event {
    pub fn from_fields(id: EventId, fields: EventFields) -> Self {
        Self {
            id,
            title: fields.title,
            description: fields.description,
            date: fields.date,
            time: fields.time,
            location: fields.location,
            image: fields.image,
        }
    }

    pub fn fields(&self) -> EventFields {
        EventFields {
            title: self.title.clone(),
            description: self.description.clone(),
            date: self.date.clone(),
            time: self.time.clone(),
            location: self.location.clone(),
            image: self.image.clone(),
        }
    }

    /// Returns a copy with the patch applied. The id is never touched.
    pub fn patched(&self, patch: &EventPatch) -> Self {
        let pick = |new: &Option<String>, old: &String| new.clone().unwrap_or_else(|| old.clone());
        Self {
            id: self.id.clone(),
            title: pick(&patch.title, &self.title),
            description: pick(&patch.description, &self.description),
            date: pick(&patch.date, &self.date),
            time: pick(&patch.time, &self.time),
            location: pick(&patch.location, &self.location),
            image: pick(&patch.image, &self.image),
        }
    }

    /// Date for display: "Jun 1, 2025". Falls back to the raw value.
    pub fn formatted_date(&self) -> String {
        match NaiveDate::parse_from_str(&self.date, "%Y-%m-%d") {
            Ok(date) => date.format("%b %-d, %Y").to_string(),
            Err(_) if self.date.is_empty() => "TBD".to_string(),
            Err(_) => self.date.clone(),
        }
    }

    /// "Jun 1, 2025 @ 18:30"
    pub fn formatted_when(&self) -> String {
        let time = NaiveTime::parse_from_str(&self.time, "%H:%M")
            .map(|t| t.format("%H:%M").to_string())
            .unwrap_or_else(|_| self.time.clone());
        if time.is_empty() {
            self.formatted_date()
        } else {
            format!("{} @ {}", self.formatted_date(), time)
        }
    }

    /// Absolute URL of the event image, resolved against the API base URL.
    pub fn image_url(&self, base_url: &str) -> Option<String> {
        if self.image.is_empty() {
            return None;
        }
        if self.image.starts_with("http://") || self.image.starts_with("https://") {
            return Some(self.image.clone());
        }
        Some(format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.image.trim_start_matches('/')
        ))
    }
}
