use crate::config::Settings;
use crate::core::model::{
    EvaluateRequest, EvaluationResult, FeedbackRequest, FeedbackResponse, GenerateRequest, GenerateResponse,
    IterativeGenerateRequest, IterativeGenerateResponse, RunPromptRequest, RunPromptResponse,
};
use crate::error::WizardError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub const GENERATE_WITH_TESTS: &str = "/api/generate-prompt-and-testcases";
pub const GENERATE_ITERATIVE: &str = "/api/generate-prompt";
pub const RUN_PROMPT: &str = "/api/run-prompt";
pub const EVALUATE_RESULTS: &str = "/api/evaluate-results";
pub const FEEDBACK: &str = "/api/feedback";

const FALLBACK_ERROR: &str = "API request failed";

pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(settings: &Settings) -> Result<Self, WizardError> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(settings.timeout).build()?,
            base_url: settings.api_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn post<B, T>(&self, endpoint: &str, body: &B) -> Result<T, WizardError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        match self.post_attempt(endpoint, body).await {
            Ok(v) => Ok(v),
            Err(e) => {
                log::error!(
                    "API call to {} failed: {} | request: {}",
                    endpoint,
                    e,
                    truncate(&serde_json::to_string(body).unwrap_or_default(), 300)
                );
                Err(e)
            }
        }
    }

    async fn post_attempt<B, T>(&self, endpoint: &str, body: &B) -> Result<T, WizardError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        log::debug!("POST {url}");

        let res = self.client.post(&url).json(body).send().await?;
        let status = res.status();
        let text = res.text().await?;

        if !status.is_success() {
            return Err(WizardError::ServiceError {
                status: status.as_u16(),
                detail: error_detail(&text),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }

    pub async fn generate_prompt_and_testcases(&self, req: &GenerateRequest) -> Result<GenerateResponse, WizardError> {
        self.post(GENERATE_WITH_TESTS, req).await
    }

    pub async fn generate_prompt(&self, req: &IterativeGenerateRequest) -> Result<IterativeGenerateResponse, WizardError> {
        self.post(GENERATE_ITERATIVE, req).await
    }

    pub async fn run_prompt(&self, req: &RunPromptRequest) -> Result<RunPromptResponse, WizardError> {
        self.post(RUN_PROMPT, req).await
    }

    pub async fn evaluate_results(&self, req: &EvaluateRequest) -> Result<EvaluationResult, WizardError> {
        self.post(EVALUATE_RESULTS, req).await
    }

    pub async fn submit_feedback(&self, req: &FeedbackRequest) -> Result<FeedbackResponse, WizardError> {
        self.post(FEEDBACK, req).await
    }
}

/// Picks the most useful message out of an error body: the `detail` field
/// FastAPI emits, else the whole JSON document, else the raw text.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => match map.get("detail") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::String(_)) | Some(Value::Null) | None => Value::Object(map).to_string(),
            Some(other) => other.to_string(),
        },
        Ok(Value::String(s)) if !s.is_empty() => s,
        Ok(Value::Null) => FALLBACK_ERROR.to_string(),
        Ok(other) => other.to_string(),
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => FALLBACK_ERROR.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max).collect();
        format!("{}... (len: {})", head, s.len())
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::TestCase;
    use crate::test_support::{StubService, settings_for};
    use axum::Json;
    use axum::http::StatusCode;
    use axum::routing::post;
    use serde_json::json;

    #[test]
    fn detail_string_is_preferred() {
        assert_eq!(error_detail(r#"{"detail": "OPENAI_API_KEY is not set"}"#), "OPENAI_API_KEY is not set");
    }

    #[test]
    fn empty_detail_falls_back_to_whole_body() {
        assert_eq!(
            error_detail(r#"{"detail": "", "error": "quota exceeded"}"#),
            r#"{"detail":"","error":"quota exceeded"}"#
        );
    }

    #[test]
    fn structured_detail_is_json_encoded() {
        let body = r#"{"detail": [{"loc": ["body", "format"], "msg": "field required"}]}"#;
        assert_eq!(error_detail(body), r#"[{"loc":["body","format"],"msg":"field required"}]"#);
    }

    #[test]
    fn body_without_detail_falls_back_to_json_then_text() {
        assert_eq!(error_detail(r#"{"error": "nope"}"#), r#"{"error":"nope"}"#);
        assert_eq!(error_detail("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_detail(""), FALLBACK_ERROR);
        assert_eq!(error_detail("null"), FALLBACK_ERROR);
    }

    #[test]
    fn truncate_marks_long_strings() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc... (len: 6)");
    }

    #[tokio::test]
    async fn run_prompt_round_trips_through_service() {
        let router = axum::Router::new().route(
            RUN_PROMPT,
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["prompt"], "Reply politely.");
                Json(json!({
                    "test_cases": [{
                        "input": body["test_cases"][0]["input"],
                        "expected_output": "Hello!",
                        "prompt_output": { "input": "hi", "output": "Hello!", "response_time": 0.3 }
                    }],
                    "total_time": 0.3
                }))
            }),
        );
        let service = StubService::start(router).await;
        let client = ApiClient::new(&settings_for(&service.base_url())).unwrap();

        let resp = client
            .run_prompt(&RunPromptRequest {
                prompt: "Reply politely.".into(),
                test_cases: vec![TestCase::new("hi", "Hello!")],
            })
            .await
            .unwrap();
        assert_eq!(resp.test_cases.len(), 1);
        assert_eq!(resp.test_cases[0].input, "hi");
        assert_eq!(resp.test_cases[0].output_text(), "Hello!");
    }

    #[tokio::test]
    async fn error_status_surfaces_detail() {
        let router = axum::Router::new().route(
            EVALUATE_RESULTS,
            post(|| async { (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "detail": "test_cases is empty" }))) }),
        );
        let service = StubService::start(router).await;
        let client = ApiClient::new(&settings_for(&format!("{}/api/", service.base_url()))).unwrap();

        let err = client
            .evaluate_results(&EvaluateRequest { prompt: "p".into(), test_cases: vec![] })
            .await
            .unwrap_err();
        match err {
            WizardError::ServiceError { status, detail } => {
                assert_eq!(status, 422);
                assert_eq!(detail, "test_cases is empty");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn malformed_success_body_is_a_json_error() {
        let router = axum::Router::new().route(FEEDBACK, post(|| async { "not json" }));
        let service = StubService::start(router).await;
        let client = ApiClient::new(&settings_for(&service.base_url())).unwrap();

        let err = client
            .submit_feedback(&FeedbackRequest { prompt: "p".into(), feedback: "f".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, WizardError::JsonError(_)));
    }
}
