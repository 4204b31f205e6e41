use serde::de::{Deserializer, Error as DeError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A newtype that collapses every representation of a rate plan's tariff
/// codes into one canonical form.
///
/// Call sites have historically produced three shapes for the same data:
/// a JSON array of strings, a comma-joined string, and a JSON-encoded
/// string wrapping one of the former. All of them normalize to a sorted,
/// de-duplicated list of trimmed codes, so comparisons never see raw
/// representations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TariffCodes(Vec<String>);

impl TariffCodes {
    /// Parse a raw string in any of the known shapes.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if trimmed.starts_with('[') {
            if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
                return Self::from_value(&value);
            }
        }

        // A JSON-encoded string wrapping an array or a comma list.
        if trimmed.starts_with('"') {
            if let Ok(inner) = serde_json::from_str::<String>(trimmed) {
                return Self::parse(&inner);
            }
        }

        Self::from_parts(trimmed.split(',').map(str::to_string))
    }

    /// Canonicalize a JSON value (array of strings, string, or null).
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self::from_parts(items.iter().map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })),
            Value::String(s) => Self::parse(s),
            _ => Self(Vec::new()),
        }
    }

    fn from_parts(parts: impl Iterator<Item = String>) -> Self {
        let mut codes: Vec<String> = parts
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect();
        codes.sort();
        codes.dedup();
        Self(codes)
    }

    /// The comma-joined form stored in the `codes` column and used for
    /// comparisons.
    pub fn as_joined(&self) -> String {
        self.0.join(",")
    }

    pub fn codes(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for TariffCodes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        match &value {
            Value::Array(_) | Value::String(_) | Value::Null => Ok(Self::from_value(&value)),
            other => Err(D::Error::custom(format!(
                "expected array or string for tariff codes, got {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_comma_string() {
        let codes = TariffCodes::parse("6900, 6970,6989");
        assert_eq!(codes.codes(), &["6900", "6970", "6989"]);
    }

    #[test]
    fn test_parse_json_array_string() {
        let codes = TariffCodes::parse(r#"["6970", "6900"]"#);
        assert_eq!(codes.as_joined(), "6900,6970");
    }

    #[test]
    fn test_parse_json_encoded_string() {
        let codes = TariffCodes::parse(r#""[\"6970\", \"6900\"]""#);
        assert_eq!(codes.as_joined(), "6900,6970");
    }

    #[test]
    fn test_representations_collapse_to_same_form() {
        let from_array = TariffCodes::from_value(&json!(["6989", "6900"]));
        let from_string = TariffCodes::from_value(&json!("6900,6989"));
        let from_encoded = TariffCodes::parse(r#""6989, 6900""#);
        assert_eq!(from_array, from_string);
        assert_eq!(from_string, from_encoded);
    }

    #[test]
    fn test_dedup_and_empty_parts() {
        let codes = TariffCodes::parse("6900,,6900, ");
        assert_eq!(codes.codes(), &["6900"]);
    }

    #[test]
    fn test_null_and_empty() {
        assert!(TariffCodes::from_value(&Value::Null).is_empty());
        assert!(TariffCodes::parse("").is_empty());
        assert_eq!(TariffCodes::parse("").as_joined(), "");
    }

    #[test]
    fn test_deserialize_from_either_shape() {
        let a: TariffCodes = serde_json::from_value(json!(["6970", "6900"])).unwrap();
        let b: TariffCodes = serde_json::from_value(json!("6900,6970")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_serializes_as_array() {
        let codes = TariffCodes::parse("6970,6900");
        assert_eq!(serde_json::to_value(&codes).unwrap(), json!(["6900", "6970"]));
    }
}
