use serde::Serialize;
use serde::de::DeserializeOwned;

/// JSON conversions available to every `Serialize + DeserializeOwned` type.
///
/// Besides plain value/string conversion this carries the newline-delimited
/// framing used by the registry line protocol: one compact JSON document per
/// line, terminated by `\n`.
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use ferrule_core::serde::SerializePipeline;
///
/// #[derive(Serialize, Deserialize, Debug, PartialEq)]
/// struct Ping { seq: u32 }
///
/// let line = Ping { seq: 7 }.to_json_line().unwrap();
/// assert_eq!(line, "{\"seq\":7}\n");
/// assert_eq!(Ping::from_json_line(&line).unwrap(), Ping { seq: 7 });
/// ```
pub trait SerializePipeline: Serialize + DeserializeOwned {
    /// Serialize to a JSON value.
    fn to_json_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Deserialize from a JSON value.
    fn from_json_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Serialize to a compact JSON string.
    fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to an indented JSON string.
    fn to_json_string_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from a JSON string.
    fn from_json_string(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to a single line terminated by `\n`.
    ///
    /// Compact JSON never contains a raw newline, so the output is always
    /// exactly one line.
    fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }

    /// Deserialize one line, tolerating a trailing `\n` or `\r\n`.
    fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim_end_matches(['\r', '\n']))
    }
}

impl<T> SerializePipeline for T where T: Serialize + DeserializeOwned {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Entry {
        resource: String,
        version: u32,
        uri: Option<String>,
    }

    fn entry() -> Entry {
        Entry {
            resource: "Purchase".to_string(),
            version: 1,
            uri: Some("http://localhost:9292/v1/purchases\nx".to_string()),
        }
    }

    #[test]
    fn json_line_is_single_line_even_with_embedded_newlines() {
        let line = entry().to_json_line().unwrap();
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn from_json_line_accepts_crlf() {
        let line = entry().to_json_string().unwrap() + "\r\n";
        assert_eq!(Entry::from_json_line(&line).unwrap(), entry());
    }

    #[test]
    fn from_json_value_reports_shape_mismatch() {
        let value = serde_json::json!({"resource": 1});
        assert!(Entry::from_json_value(value).is_err());
    }
}
