use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use std::io::Read;

#[derive(Debug, Deserialize)]
pub(crate) struct ReportRow {
    pub(crate) id: String,
    pub(crate) animal: String,
    #[serde(default)]
    pub(crate) condition: String,
    pub(crate) urgency: String,
    pub(crate) latitude: f64,
    pub(crate) longitude: f64,
    #[serde(default)]
    pub(crate) description: String,
    pub(crate) created_at: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) required: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) recommended: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VolunteerRow {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub(crate) trainings: Option<String>,
    #[serde(default = "default_available")]
    pub(crate) available: bool,
    #[serde(default, deserialize_with = "empty_f64_as_none")]
    pub(crate) latitude: Option<f64>,
    #[serde(default, deserialize_with = "empty_f64_as_none")]
    pub(crate) longitude: Option<f64>,
}

fn default_available() -> bool {
    true
}

pub(crate) fn parse_rows<R: Read, T: for<'de> Deserialize<'de>>(
    reader: R,
) -> Result<Vec<T>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    csv_reader.deserialize::<T>().collect()
}

/// Split `tag=Label;tag2=Label 2` cells. A bare tag doubles as its label.
pub(crate) fn split_tag_list(raw: Option<&str>) -> Vec<(String, String)> {
    raw.unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((tag, label)) if !label.trim().is_empty() => {
                (tag.trim().to_string(), label.trim().to_string())
            }
            Some((tag, _)) => (tag.trim().to_string(), tag.trim().to_string()),
            None => (entry.to_string(), entry.to_string()),
        })
        .collect()
}

pub(crate) fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }

    None
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn empty_f64_as_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    match opt.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
