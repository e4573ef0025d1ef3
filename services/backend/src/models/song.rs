use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::Value;

pub const SONG_COLLECTION: &str = "song";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Song {
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default, deserialize_with = "lax_year")]
    pub year: Option<i64>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub listen_url: Option<String>,
    #[serde(default = "default_is_free", deserialize_with = "lax_bool")]
    pub is_free: bool,
}

fn default_is_free() -> bool {
    true
}

/// Accepts integers, integral floats and numeric strings.
fn lax_year<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => lax_int(&value)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid year {}, expected an integer", value))),
    }
}

fn lax_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts booleans, 0/1 and the usual yes/no spellings.
fn lax_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    lax_flag(&value)
        .ok_or_else(|| de::Error::custom(format!("invalid is_free {}, expected a boolean", value)))
}

fn lax_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => match number.as_f64() {
            Some(n) if n == 1.0 => Some(true),
            Some(n) if n == 0.0 => Some(false),
            _ => None,
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "1" | "on" | "t" | "true" | "y" | "yes" => Some(true),
            "0" | "off" | "f" | "false" | "n" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// A stored song as returned to clients after insert.
#[derive(Serialize, Clone, Debug)]
pub struct SongRecord {
    pub id: String,
    #[serde(flatten)]
    pub song: Song,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SongQuery {
    pub q: Option<String>,
    pub genre: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}
