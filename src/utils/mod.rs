use serde_json::{Map, Value};

use crate::domain::{LaunchParameters, ViewerError};

/// Decode launch parameters from command-line arguments.
///
/// Accepts either a single JSON object or `key=value` pairs using the
/// activation keys. A bare first argument is taken as the document URL.
pub fn parse_launch_args<I>(args: I) -> Result<LaunchParameters, ViewerError>
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().collect();

    if let [single] = args.as_slice() {
        if single.trim_start().starts_with('{') {
            return serde_json::from_str(single)
                .map_err(|e| ViewerError::LaunchParameters(e.to_string()));
        }
    }

    let mut extras = Map::new();
    for (index, arg) in args.iter().enumerate() {
        match arg.split_once('=') {
            Some((key, value)) if !key.is_empty() && !key.contains(':') => {
                extras.insert(key.to_string(), extra_value(value));
            }
            _ if index == 0 => {
                extras.insert("pdf_file_url".to_string(), Value::String(arg.clone()));
            }
            _ => {
                return Err(ViewerError::LaunchParameters(format!(
                    "expected key=value, got {:?}",
                    arg
                )))
            }
        }
    }

    LaunchParameters::from_extras(extras)
}

fn extra_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}
