use serde::de::DeserializeOwned;

use crate::error::{GenError, Result};

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_str(src);
    serde_path_to_error::deserialize::<_, T>(de).map_err(into_gen_error)
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize::<_, T>(de).map_err(into_gen_error)
}

/// For inputs that were already parsed, e.g. inline `json!` values.
pub fn from_value_with_path<T: DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(into_gen_error)
}

fn into_gen_error<E: std::fmt::Display>(err: serde_path_to_error::Error<E>) -> GenError {
    GenError::Deserialize {
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Outer {
        items: Vec<Inner>,
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Inner {
        named: bool,
    }

    #[test]
    fn reports_json_path() {
        let error = from_str_with_path::<Outer>(r#"{"items": [{"named": true}, {"named": 1}]}"#).unwrap_err();
        match &error {
            GenError::Deserialize { path, .. } => assert_eq!(path, "items[1].named"),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(error.to_string().starts_with("at JSON path items[1].named → invalid type"));
    }
}
