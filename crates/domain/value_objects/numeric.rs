use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Deserializer, de};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText<T> {
    Number(T),
    Text(String),
}

/// Accepts `14` as well as `"14"`. Existing clients send several numeric
/// fields as strings.
pub fn number_or_string<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + FromStr,
    T::Err: Display,
{
    match NumberOrText::<T>::deserialize(deserializer)? {
        NumberOrText::Number(value) => Ok(value),
        NumberOrText::Text(text) => text
            .trim()
            .parse::<T>()
            .map_err(|err| de::Error::custom(format!("invalid number \"{text}\": {err}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Body {
        #[serde(deserialize_with = "number_or_string")]
        count: u32,
        #[serde(deserialize_with = "number_or_string")]
        at: i64,
    }

    #[test]
    fn numbers_and_numeric_strings_both_parse() {
        let from_numbers: Body = serde_json::from_str(r#"{"count":14,"at":1700000000}"#).unwrap();
        let from_strings: Body =
            serde_json::from_str(r#"{"count":"14","at":" 1700000000 "}"#).unwrap();

        assert_eq!(from_numbers.count, 14);
        assert_eq!(from_strings.count, 14);
        assert_eq!(from_numbers.at, from_strings.at);
    }

    #[test]
    fn non_numeric_strings_are_rejected() {
        let err = serde_json::from_str::<Body>(r#"{"count":"fourteen","at":1}"#).unwrap_err();
        assert!(err.to_string().contains("fourteen"));

        assert!(serde_json::from_str::<Body>(r#"{"count":-1,"at":1}"#).is_err());
        assert!(serde_json::from_str::<Body>(r#"{"count":true,"at":1}"#).is_err());
    }
}
