//! Lenient deserializers for query-string parameters.
//!
//! Query strings arrive as text, and `#[serde(flatten)]` buffers every value
//! as a string, so numeric and boolean filters must be parsed by hand. An
//! empty value (`?school_id=`) means "not set".

use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use uuid::Uuid;

fn parse_optional<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse::<T>().map(Some).map_err(serde::de::Error::custom),
    }
}

pub fn deserialize_optional_uuid<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    parse_optional(deserializer)
}

pub fn deserialize_optional_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    parse_optional(deserializer)
}

pub fn deserialize_optional_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    parse_optional(deserializer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Filters {
        #[serde(default, deserialize_with = "deserialize_optional_uuid")]
        school_id: Option<Uuid>,
        #[serde(default, deserialize_with = "deserialize_optional_bool")]
        active_only: Option<bool>,
    }

    #[test]
    fn empty_strings_are_none() {
        let f: Filters = serde_json::from_str(r#"{"school_id":"","active_only":""}"#).unwrap();
        assert!(f.school_id.is_none());
        assert!(f.active_only.is_none());
    }

    #[test]
    fn textual_values_are_parsed() {
        let id = Uuid::new_v4();
        let json = format!(r#"{{"school_id":"{}","active_only":"true"}}"#, id);
        let f: Filters = serde_json::from_str(&json).unwrap();
        assert_eq!(f.school_id, Some(id));
        assert_eq!(f.active_only, Some(true));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(serde_json::from_str::<Filters>(r#"{"active_only":"maybe"}"#).is_err());
    }
}
