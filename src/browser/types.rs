use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// W3C key under which element references are returned.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

#[derive(Debug, Serialize, Deserialize)]
pub struct WireResponse {
    pub value: Value,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireError {
    pub error: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NewSession {
    #[serde(rename = "sessionId")]
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Timeouts {
    #[serde(rename = "pageLoad", skip_serializing_if = "Option::is_none")]
    pub page_load: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implicit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<u64>,
}

impl WireError {
    /// Parses an error body if `value` carries one.
    pub fn from_value(value: &Value) -> Option<Self> {
        value.get("error")?;
        serde_json::from_value(value.clone()).ok()
    }
}

/// Capabilities for a Chrome session with eager page loads.
pub fn chrome_capabilities(
    arguments: &[String],
    width: u32,
    height: u32,
    binary: Option<&str>,
    timeout_ms: u64,
) -> Value {
    let mut args: Vec<String> = vec![format!("--window-size={},{}", width, height)];
    args.extend(arguments.iter().cloned());

    let mut chrome_options = json!({
        "args": args,
        "excludeSwitches": ["enable-logging"],
    });
    if let Some(binary) = binary {
        chrome_options["binary"] = json!(binary);
    }

    json!({
        "capabilities": {
            "alwaysMatch": {
                "browserName": "chrome",
                "pageLoadStrategy": "eager",
                "timeouts": {
                    "pageLoad": timeout_ms,
                    "implicit": timeout_ms,
                    "script": timeout_ms,
                },
                "goog:chromeOptions": chrome_options,
            }
        }
    })
}

/// Extracts element ids from a `find elements` result.
pub fn element_ids(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(ELEMENT_KEY).and_then(|v| v.as_str()))
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}
