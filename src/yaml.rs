//! YAML parsing using serde_yaml
//!
//! Documents are deserialized straight into typed structs. Plain scalars read
//! into `String` fields keep their source text, so `007` stays `007` rather
//! than going through an integer first.

use serde::de::DeserializeOwned;

use crate::{Error, Result};

/// Parse a YAML string into `T`
///
/// An empty document is an error rather than `T::default()`. Errors are
/// tagged with `context` so the caller can tell which document failed.
pub fn parse_yaml_as<T: DeserializeOwned>(input: &str, context: &str) -> Result<T> {
    match serde_yaml::from_str::<Option<T>>(input) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Err(Error::parse(context, "document is empty")),
        Err(e) => Err(Error::parse(context, e.to_string())),
    }
}
