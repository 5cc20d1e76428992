use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestCaseVisibility {
    Public,
    Private,
}

impl Default for TestCaseVisibility {
    fn default() -> Self {
        Self::Public
    }
}

/// One judge test case. `expected_output` is what the grader compares the
/// program's stdout against; private cases are masked in every client-facing
/// result view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default)]
    pub input: String,
    #[serde(rename = "output", alias = "expected_output", default)]
    pub expected_output: String,
    #[serde(rename = "type", default)]
    pub visibility: TestCaseVisibility,
}

impl TestCase {
    pub fn is_private(&self) -> bool {
        self.visibility == TestCaseVisibility::Private
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodingQuestion {
    pub id: Uuid,
    pub company_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub constraints: String,
    #[serde(default = "default_difficulty")]
    pub difficulty: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub time_limit: Option<i32>,
    #[serde(default)]
    pub memory_limit: Option<i32>,
    pub test_cases: Vec<TestCase>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_difficulty() -> String {
    "medium".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_accepts_both_output_keys() {
        let a: TestCase = serde_json::from_str(r#"{"input":"1","output":"2"}"#).unwrap();
        let b: TestCase =
            serde_json::from_str(r#"{"input":"1","expected_output":"2","type":"private"}"#)
                .unwrap();
        assert_eq!(a.expected_output, "2");
        assert_eq!(a.visibility, TestCaseVisibility::Public);
        assert_eq!(b.expected_output, "2");
        assert!(b.is_private());
    }
}
