use std::{convert::Infallible, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use database_api::Row;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Identifier assigned by the database. Integer keys and uuid/text keys are both accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(Box<str>),
}

impl RecordId {
    pub fn to_value(&self) -> Value {
        match self {
            RecordId::Int(id) => Value::from(*id),
            RecordId::Text(id) => Value::from(id.as_ref()),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{id}"),
            RecordId::Text(id) => f.write_str(id),
        }
    }
}

impl FromStr for RecordId {
    type Err = Infallible;

    /// Text that is not the canonical form of an integer ("007", "+5", "-0") stays text.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.parse::<i64>() {
            Ok(id) if id.to_string() == s => RecordId::Int(id),
            _ => RecordId::Text(s.into()),
        })
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::Text(id.into())
    }
}

/// Everything a caller provides when saving a generation session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NewGenerationInput {
    pub video_type: String,
    pub image_type: String,
    pub video_links: Vec<String>,
    pub image_links: Vec<String>,
    pub titles: Vec<String>,
    pub descriptions: Vec<String>,
    pub generated_html: String,
}

impl NewGenerationInput {
    /// Whether every title has a description and vice versa.
    pub fn is_aligned(&self) -> bool {
        self.titles.len() == self.descriptions.len()
    }
}

/// A saved card generation session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRecord {
    pub id: RecordId,
    pub video_type: String,
    pub image_type: String,
    pub video_links: Vec<String>,
    pub image_links: Vec<String>,
    pub titles: Vec<String>,
    pub descriptions: Vec<String>,
    pub generated_html: String,
    pub created_at: DateTime<Utc>,
}

/// Row layout of the `card_generations` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRow {
    pub id: RecordId,
    #[serde(default, deserialize_with = "nullable")]
    pub video_type: String,
    #[serde(default, deserialize_with = "nullable")]
    pub image_type: String,
    #[serde(default, deserialize_with = "nullable")]
    pub video_links: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_links: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub titles: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub descriptions: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub generated_html: String,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Insert payload; `id` and `created_at` are left to the database.
#[derive(Serialize)]
pub(crate) struct NewGenerationRow<'a> {
    video_type: &'a str,
    image_type: &'a str,
    video_links: &'a [String],
    image_links: &'a [String],
    titles: &'a [String],
    descriptions: &'a [String],
    generated_html: &'a str,
}

impl<'a> From<&'a NewGenerationInput> for NewGenerationRow<'a> {
    fn from(input: &'a NewGenerationInput) -> Self {
        Self {
            video_type: &input.video_type,
            image_type: &input.image_type,
            video_links: &input.video_links,
            image_links: &input.image_links,
            titles: &input.titles,
            descriptions: &input.descriptions,
            generated_html: &input.generated_html,
        }
    }
}

impl From<GenerationRow> for GenerationRecord {
    fn from(row: GenerationRow) -> Self {
        Self {
            id: row.id,
            video_type: row.video_type,
            image_type: row.image_type,
            video_links: row.video_links,
            image_links: row.image_links,
            titles: row.titles,
            descriptions: row.descriptions,
            generated_html: row.generated_html,
            created_at: row.created_at,
        }
    }
}

impl From<GenerationRecord> for GenerationRow {
    fn from(record: GenerationRecord) -> Self {
        Self {
            id: record.id,
            video_type: record.video_type,
            image_type: record.image_type,
            video_links: record.video_links,
            image_links: record.image_links,
            titles: record.titles,
            descriptions: record.descriptions,
            generated_html: record.generated_html,
            created_at: record.created_at,
        }
    }
}

impl GenerationRow {
    pub fn from_row(row: Row) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(row))
    }

    pub fn to_row(&self) -> Result<Row, serde_json::Error> {
        to_row(self)
    }
}

pub(crate) fn to_row<T: Serialize>(value: &T) -> Result<Row, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(row) => Ok(row),
        other => Err(serde::ser::Error::custom(format!("expected a JSON object, got {other}"))),
    }
}

// Nullable columns decode to the empty value
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Serde (de)serialization of database timestamps
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
    use serde::{
        de::{self, Visitor},
        Deserializer, Serializer,
    };

    struct TimestampVisitor;

    impl<'de> Visitor<'de> for TimestampVisitor {
        type Value = DateTime<Utc>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("an RFC 3339 timestamp")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
                return Ok(parsed.with_timezone(&Utc));
            }
            // columns without time zone come back without an offset and are stored as UTC
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .map(|naive| naive.and_utc())
                .map_err(|_| E::invalid_value(de::Unexpected::Str(value), &self))
        }
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(TimestampVisitor)
    }
}
