use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::submission::JudgeStatus;

/// Terminal report for one submit-and-wait round trip. `time` is seconds and
/// `memory` kilobytes, as reported by the judge; the grading engine converts
/// to milliseconds and megabytes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeResponse {
    pub status: JudgeStatus,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub time: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub memory: Option<f64>,
}

// The judge serializes `time` as a decimal string and `memory` as a number.
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Text(String),
        Null,
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Some(n),
        Raw::Text(s) => s.trim().parse::<f64>().ok(),
        Raw::Null => None,
    })
}

/// External code-execution service. One call grades one test case: the
/// program runs against `stdin` and the call blocks until the judge reports a
/// terminal status.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Judge: Send + Sync {
    async fn submit_and_wait(
        &self,
        source_code: &str,
        language_id: i32,
        stdin: &str,
    ) -> Result<JudgeResponse>;
}

/// Resolve a client-facing language name to the judge's language id.
/// Unresolvable names are rejected before any judge call.
pub fn resolve_language_id(language: &str) -> Result<i32> {
    let id = match language.trim().to_lowercase().as_str() {
        "c" => 50,
        "csharp" | "c#" => 51,
        "cpp" | "c++" => 54,
        "go" | "golang" => 60,
        "java" => 62,
        "javascript" | "js" | "node" => 63,
        "php" => 68,
        "python" | "python3" => 71,
        "ruby" => 72,
        "rust" => 73,
        "typescript" | "ts" => 74,
        "kotlin" => 78,
        "swift" => 83,
        other => {
            return Err(Error::BadRequest(format!(
                "Unsupported language: '{}'",
                other
            )))
        }
    };
    Ok(id)
}

#[derive(Clone)]
pub struct JudgeService {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl JudgeService {
    pub fn new(base_url: String, api_key: Option<String>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to build judge HTTP client");
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl Judge for JudgeService {
    async fn submit_and_wait(
        &self,
        source_code: &str,
        language_id: i32,
        stdin: &str,
    ) -> Result<JudgeResponse> {
        let url = format!("{}/submissions?base64_encoded=false&wait=true", self.base_url);
        let mut request = self.client.post(&url).json(&json!({
            "source_code": source_code,
            "language_id": language_id,
            "stdin": stdin,
        }));
        if let Some(ref key) = self.api_key {
            request = request.header("X-Auth-Token", key.clone());
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Error::ExternalService(format!(
                "Judge returned HTTP {}",
                response.status()
            )));
        }
        Ok(response.json::<JudgeResponse>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_names_resolve_case_insensitively() {
        assert_eq!(resolve_language_id("Python").unwrap(), 71);
        assert_eq!(resolve_language_id(" C++ ").unwrap(), 54);
        assert_eq!(resolve_language_id("javascript").unwrap(), 63);
    }

    #[test]
    fn unknown_language_is_rejected() {
        assert!(matches!(
            resolve_language_id("cobol"),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn judge_response_accepts_string_time() {
        let raw = r#"{
            "status": {"id": 3, "description": "Accepted"},
            "stdout": "4\n",
            "time": "0.021",
            "memory": 3456
        }"#;
        let parsed: JudgeResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.time, Some(0.021));
        assert_eq!(parsed.memory, Some(3456.0));
    }
}
