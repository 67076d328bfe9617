use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{Result, TriggerError};

pub(crate) const BUILTIN_DEFAULT: &str = include_str!("../../../triggers/default.json");

const SUPPORTED_SCHEMA_VERSION: u32 = 1;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawTriggerConfig {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub types: BTreeMap<String, RawProblemType>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawProblemType {
    pub name: Option<String>,
    /// Literal words or phrases, matched as whole words.
    #[serde(default)]
    pub triggers: Vec<String>,
    /// Raw regular expressions, used as written.
    #[serde(default)]
    pub patterns: Vec<String>,
}

/// Parse a trigger configuration. JSON is tried first, TOML second.
pub(crate) fn parse_raw(bytes: &[u8]) -> Result<RawTriggerConfig> {
    let value: serde_json::Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(json_err) => {
            let utf8 = std::str::from_utf8(bytes)
                .map_err(|err| TriggerError::parse(format!("{json_err}; {err}")))?;
            let toml_value: toml::Value = toml::from_str(utf8).map_err(|toml_err| {
                TriggerError::parse(format!(
                    "config is not valid JSON or TOML ({json_err}); TOML parse error: {toml_err}"
                ))
            })?;
            serde_json::to_value(toml_value).map_err(|err| {
                TriggerError::parse(format!("failed to convert TOML config to JSON: {err}"))
            })?
        }
    };

    let raw: RawTriggerConfig = serde_json::from_value(value)
        .map_err(|err| TriggerError::parse(format!("trigger config: {err}")))?;

    if let Some(version) = raw.schema_version {
        if version != SUPPORTED_SCHEMA_VERSION {
            return Err(TriggerError::UnsupportedSchema(version));
        }
    }

    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_json_config() {
        let raw = parse_raw(
            br#"{"schema_version":1,"types":{"refund":{"name":"Refunds","triggers":["refund"]}}}"#,
        )
        .unwrap();
        let refund = raw.types.get("refund").unwrap();
        assert_eq!(refund.name.as_deref(), Some("Refunds"));
        assert_eq!(refund.triggers, vec!["refund".to_string()]);
        assert!(refund.patterns.is_empty());
    }

    #[test]
    fn falls_back_to_toml() {
        let raw = parse_raw(
            br#"
schema_version = 1

[types.delivery]
name = "Delivery problems"
triggers = ["not delivered", "lost parcel"]
"#,
        )
        .unwrap();
        assert_eq!(raw.types["delivery"].triggers.len(), 2);
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = parse_raw(br#"{"types":{"refund":{"trigers":["refund"]}}}"#).unwrap_err();
        assert!(matches!(err, TriggerError::ParseError(_)), "{err}");
    }

    #[test]
    fn rejects_unsupported_schema() {
        let err = parse_raw(br#"{"schema_version":2,"types":{}}"#).unwrap_err();
        assert!(matches!(err, TriggerError::UnsupportedSchema(2)));
    }

    #[test]
    fn bundled_config_parses() {
        let raw = parse_raw(BUILTIN_DEFAULT.as_bytes()).unwrap();
        assert!(!raw.types.is_empty());
    }
}
