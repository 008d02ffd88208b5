//! Shared domain models.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};

/// Placeholder rendered for a missing value.
pub const MISSING: &str = "-";

/// Countries covered by the timetable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Country {
    /// Sweden.
    SE,
    /// Norway.
    NO,
    /// Denmark.
    DK,
    /// Finland.
    FI,
}

impl Country {
    /// Every known country, in display order.
    pub const ALL: [Country; 4] = [Country::SE, Country::NO, Country::DK, Country::FI];

    /// Two-letter country code.
    pub fn code(self) -> &'static str {
        match self {
            Country::SE => "SE",
            Country::NO => "NO",
            Country::DK => "DK",
            Country::FI => "FI",
        }
    }

    /// English country name.
    pub fn name(self) -> &'static str {
        match self {
            Country::SE => "Sweden",
            Country::NO => "Norway",
            Country::DK => "Denmark",
            Country::FI => "Finland",
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Country {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        Country::ALL
            .into_iter()
            .find(|country| country.code() == code)
            .ok_or_else(|| format!("unknown country code '{s}'"))
    }
}

/// A single timetable entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Train {
    /// Unique identifier within a collection.
    pub id: String,
    /// Operating carrier code (e.g. `SJ`, `VY`).
    pub operator: String,
    /// Country the entry belongs to.
    pub country: Country,
    /// Origin station.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Destination station.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Scheduled arrival, nominally `HH:MM`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_time: Option<String>,
    /// Platform/track designation.
    #[serde(
        default,
        deserialize_with = "deserialize_text_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub track: Option<String>,
    /// Operational train number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otn: Option<String>,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Train number announced to passengers.
    #[serde(
        default,
        deserialize_with = "deserialize_text_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub announced_train_number: Option<String>,
    /// Proposed arrival time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_time: Option<String>,
    /// Proposed track.
    #[serde(
        default,
        deserialize_with = "deserialize_text_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub new_track: Option<String>,
    /// Proposed operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_operator: Option<String>,
    /// Proposed notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_notes: Option<String>,
    /// Whether the entry has been handled.
    pub completed: bool,
    /// UI emphasis flag.
    #[serde(default, alias = "highlight")]
    pub highlighted: bool,
}

/// A proposed change carried by one of the `new*` shadow fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange<'a> {
    /// Label of the base field.
    pub field: &'static str,
    /// Current value of the base field.
    pub current: Option<&'a str>,
    /// Proposed replacement.
    pub proposed: &'a str,
}

impl Train {
    /// Create a pending entry with only the required fields set.
    pub fn new(id: impl Into<String>, operator: impl Into<String>, country: Country) -> Self {
        Self {
            id: id.into(),
            operator: operator.into(),
            country,
            from: None,
            to: None,
            arrival_time: None,
            track: None,
            otn: None,
            notes: None,
            announced_train_number: None,
            new_time: None,
            new_track: None,
            new_operator: None,
            new_notes: None,
            completed: false,
            highlighted: false,
        }
    }

    /// Human-readable status label.
    pub fn status_label(&self) -> &'static str {
        if self.completed {
            "Completed"
        } else {
            "Pending"
        }
    }

    /// `"from → to"` with placeholders for missing stations.
    pub fn route_label(&self) -> String {
        format!("{} → {}", display(&self.from), display(&self.to))
    }

    /// Proposed changes paired with the values they would replace.
    pub fn pending_changes(&self) -> Vec<PendingChange<'_>> {
        let pairs: [(&'static str, Option<&str>, Option<&str>); 4] = [
            ("arrivalTime", self.arrival_time.as_deref(), self.new_time.as_deref()),
            ("track", self.track.as_deref(), self.new_track.as_deref()),
            ("operator", Some(self.operator.as_str()), self.new_operator.as_deref()),
            ("notes", self.notes.as_deref(), self.new_notes.as_deref()),
        ];
        pairs
            .into_iter()
            .filter_map(|(field, current, proposed)| {
                proposed.map(|proposed| PendingChange {
                    field,
                    current,
                    proposed,
                })
            })
            .collect()
    }

    /// Whether any proposed change is attached to this entry.
    pub fn has_pending_changes(&self) -> bool {
        self.new_time.is_some()
            || self.new_track.is_some()
            || self.new_operator.is_some()
            || self.new_notes.is_some()
    }
}

/// Render an optional value, substituting the missing placeholder.
pub fn display(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(MISSING)
}

fn deserialize_text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrNumber {
        Text(String),
        Integer(i64),
        Float(f64),
    }

    let raw: Option<TextOrNumber> = Option::deserialize(deserializer)?;
    Ok(raw.map(|value| match value {
        TextOrNumber::Text(text) => text,
        TextOrNumber::Integer(num) => num.to_string(),
        TextOrNumber::Float(num) => num.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_camel_case_payload() {
        let train: Train = serde_json::from_value(json!({
            "id": "42",
            "operator": "SJ",
            "country": "SE",
            "from": "Stockholm C",
            "arrivalTime": "12:05",
            "track": 4,
            "announcedTrainNumber": "531",
            "newTrack": "5b",
            "completed": false,
            "highlight": true
        }))
        .expect("valid train");

        assert_eq!(train.track.as_deref(), Some("4"));
        assert_eq!(train.arrival_time.as_deref(), Some("12:05"));
        assert_eq!(train.new_track.as_deref(), Some("5b"));
        assert!(train.highlighted);
        assert_eq!(train.to, None);
    }

    #[test]
    fn pending_changes_pair_shadow_fields() {
        let mut train = Train::new("1", "VY", Country::NO);
        assert!(!train.has_pending_changes());

        train.track = Some("2".to_string());
        train.new_track = Some("3".to_string());
        train.new_operator = Some("SJ".to_string());

        let changes = train.pending_changes();
        assert!(train.has_pending_changes());
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].field, "track");
        assert_eq!(changes[0].current, Some("2"));
        assert_eq!(changes[0].proposed, "3");
        assert_eq!(changes[1].current, Some("VY"));
    }

    #[test]
    fn country_codes_parse_case_insensitively() {
        assert_eq!("dk".parse::<Country>(), Ok(Country::DK));
        assert!("XX".parse::<Country>().is_err());
        assert_eq!(Country::FI.to_string(), "FI");
    }

    #[test]
    fn route_label_uses_placeholder() {
        let mut train = Train::new("1", "DSB", Country::DK);
        train.from = Some("Odense".to_string());
        assert_eq!(train.route_label(), "Odense → -");
    }
}
