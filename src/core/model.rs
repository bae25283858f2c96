use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InputOutputRow {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub output: String,
}

impl InputOutputRow {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Self { input: input.into(), output: output.into() }
    }

    pub fn is_filled(&self) -> bool {
        !self.input.trim().is_empty() && !self.output.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DetailedOutput {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub response_time: f64,
}

/// The service reports a run either as bare text or with timing attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum PromptOutput {
    Detailed(DetailedOutput),
    Text(String),
}

impl PromptOutput {
    pub fn text(&self) -> &str {
        match self {
            PromptOutput::Detailed(d) => &d.output,
            PromptOutput::Text(s) => s,
        }
    }

    pub fn response_time(&self) -> Option<f64> {
        match self {
            PromptOutput::Detailed(d) => Some(d.response_time),
            PromptOutput::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TestCase {
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub expected_output: String,
    #[serde(default, alias = "actual_output", skip_serializing_if = "Option::is_none")]
    pub prompt_output: Option<PromptOutput>,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default)]
    pub similarity_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_history: Option<String>,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
            ..Default::default()
        }
    }

    pub fn output_text(&self) -> &str {
        self.prompt_output.as_ref().map(PromptOutput::text).unwrap_or("")
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_correct { "Passed" } else { "Failed" }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub format: String,
    pub samples: Vec<InputOutputRow>,
    pub conditions: String,
    pub num_test_cases: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(alias = "prompt")]
    pub generated_prompt: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub total_time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IterativeGenerateRequest {
    pub format: String,
    pub samples: Vec<InputOutputRow>,
    pub conditions: String,
    pub iteration: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationStep {
    pub iteration: u32,
    pub accuracy: f64,
    pub response_time: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IterativeGenerateResponse {
    pub generated_prompt: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub response_time: f64,
    #[serde(default)]
    pub iteration: u32,
    #[serde(default)]
    pub optimization_history: Vec<OptimizationStep>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunPromptRequest {
    pub prompt: String,
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunPromptResponse {
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub total_time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluateRequest {
    pub prompt: String,
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EvaluationResult {
    #[serde(default)]
    pub accuracy: f64,
    #[serde(default)]
    pub avg_similarity: f64,
    #[serde(default, alias = "test_results")]
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedbackRequest {
    pub prompt: String,
    pub feedback: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackResponse {
    #[serde(default)]
    pub message: String,
}
