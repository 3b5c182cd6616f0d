//! Shared serialization utilities.

use serde::{Deserialize, Deserializer};

/// Deserialize either a single value or an array of values into a `Vec`.
///
/// The trade channel delivers a lone record or a batch; both normalize to a
/// flat sequence with batch boundaries erased.
pub fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        One(T),
        Many(Vec<T>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(value) => vec![value],
        OneOrMany::Many(values) => values,
    })
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Wrapper {
        #[serde(deserialize_with = "super::one_or_many")]
        data: Vec<u64>,
    }

    #[test]
    fn test_single_value() {
        let parsed: Wrapper = serde_json::from_str(r#"{"data": 7}"#).unwrap();
        assert_eq!(parsed.data, vec![7]);
    }

    #[test]
    fn test_array_preserves_order() {
        let parsed: Wrapper = serde_json::from_str(r#"{"data": [3, 1, 2]}"#).unwrap();
        assert_eq!(parsed.data, vec![3, 1, 2]);
    }

    #[test]
    fn test_empty_array() {
        let parsed: Wrapper = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(parsed.data.is_empty());
    }
}
