use crate::api::client::ApiClient;
use crate::core::model::{
    EvaluateRequest, FeedbackRequest, GenerateRequest, IterativeGenerateRequest, OptimizationStep, RunPromptRequest,
};
use crate::core::session::Session;
use crate::error::WizardError;
use std::time::Instant;

/// Drives the three wizard steps against the remote service. Every failure
/// is also written to `session.last_error` so the next `show` displays it.
pub struct Wizard {
    client: ApiClient,
}

impl Wizard {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn generate(&self, session: &mut Session) -> Result<(), WizardError> {
        let result = self.generate_inner(session).await;
        note_failure(session, result)
    }

    async fn generate_inner(&self, session: &mut Session) -> Result<(), WizardError> {
        session.validate_inputs()?;
        let req = GenerateRequest {
            format: session.json_input.clone(),
            samples: session.filled_samples(),
            conditions: session.conditions.clone(),
            num_test_cases: session.num_test_cases,
        };

        log::info!("🧠 Generating prompt with {} samples, {} test cases requested", req.samples.len(), req.num_test_cases);
        let started = Instant::now();
        let resp = self.client.generate_prompt_and_testcases(&req).await?;
        log::info!(
            "   -> {} test cases in {:.2}s (service reported {:.2}s)",
            resp.test_cases.len(),
            started.elapsed().as_secs_f64(),
            resp.total_time
        );

        session.apply_generated(resp.generated_prompt, resp.test_cases);
        Ok(())
    }

    /// Older single-call flow where the service refines the prompt in rounds.
    pub async fn generate_iterative(&self, session: &mut Session) -> Result<Vec<OptimizationStep>, WizardError> {
        let result = self.generate_iterative_inner(session).await;
        note_failure(session, result)
    }

    async fn generate_iterative_inner(&self, session: &mut Session) -> Result<Vec<OptimizationStep>, WizardError> {
        session.validate_inputs()?;
        let req = IterativeGenerateRequest {
            format: session.json_input.clone(),
            samples: session.filled_samples(),
            conditions: session.conditions.clone(),
            iteration: 0,
        };

        log::info!("🔁 Generating prompt iteratively");
        let resp = self.client.generate_prompt(&req).await?;
        log::info!(
            "   -> stopped at iteration {} with accuracy {:.2} ({:.2}s)",
            resp.iteration,
            resp.accuracy,
            resp.response_time
        );

        session.apply_generated(resp.generated_prompt, resp.test_cases);
        Ok(resp.optimization_history)
    }

    pub async fn run(&self, session: &mut Session) -> Result<(), WizardError> {
        let result = self.run_inner(session).await;
        note_failure(session, result)
    }

    async fn run_inner(&self, session: &mut Session) -> Result<(), WizardError> {
        require_prompt(session)?;
        require_test_cases(session)?;
        let req = RunPromptRequest {
            prompt: session.prompt.clone(),
            test_cases: session.test_cases.clone(),
        };

        log::info!("🚀 Running prompt against {} test cases", req.test_cases.len());
        let resp = self.client.run_prompt(&req).await?;
        log::info!("   -> done in {:.2}s", resp.total_time);
        for (i, case) in resp.test_cases.iter().enumerate() {
            if let Some(secs) = case.prompt_output.as_ref().and_then(|o| o.response_time()) {
                log::debug!("      case #{} answered in {:.2}s", i + 1, secs);
            }
        }

        session.apply_run(resp.test_cases);
        Ok(())
    }

    pub async fn evaluate(&self, session: &mut Session) -> Result<(), WizardError> {
        let result = self.evaluate_inner(session).await;
        note_failure(session, result)
    }

    async fn evaluate_inner(&self, session: &mut Session) -> Result<(), WizardError> {
        require_test_cases(session)?;
        let req = EvaluateRequest {
            prompt: session.prompt.clone(),
            test_cases: session.test_cases.clone(),
        };

        log::info!("📊 Evaluating {} test cases", req.test_cases.len());
        let result = self.client.evaluate_results(&req).await?;
        log::info!("   -> accuracy {:.3}, avg similarity {:.3}", result.accuracy, result.avg_similarity);

        session.apply_evaluation(result);
        Ok(())
    }

    pub async fn feedback(&self, session: &mut Session, feedback: &str) -> Result<String, WizardError> {
        let result = self.feedback_inner(session, feedback).await;
        note_failure(session, result)
    }

    async fn feedback_inner(&self, session: &Session, feedback: &str) -> Result<String, WizardError> {
        require_prompt(session)?;
        if feedback.trim().is_empty() {
            return Err(WizardError::ValidationFailed("feedback text is empty".into()));
        }
        let resp = self
            .client
            .submit_feedback(&FeedbackRequest {
                prompt: session.prompt.clone(),
                feedback: feedback.to_string(),
            })
            .await?;
        Ok(resp.message)
    }
}

fn note_failure<T>(session: &mut Session, result: Result<T, WizardError>) -> Result<T, WizardError> {
    if let Err(e) = &result {
        session.record_error(e.to_string());
    }
    result
}

fn require_prompt(session: &Session) -> Result<(), WizardError> {
    if session.prompt.trim().is_empty() {
        return Err(WizardError::ValidationFailed("no prompt yet; run `generate` or `prompt set` first".into()));
    }
    Ok(())
}

fn require_test_cases(session: &Session) -> Result<(), WizardError> {
    if session.test_cases.is_empty() {
        return Err(WizardError::ValidationFailed("there are no test cases to run".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::{EVALUATE_RESULTS, FEEDBACK, GENERATE_ITERATIVE, GENERATE_WITH_TESTS, RUN_PROMPT};
    use crate::core::model::{InputOutputRow, TestCase};
    use crate::core::session::Step;
    use crate::test_support::{StubService, settings_for};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    fn stub_router() -> Router {
        Router::new()
            .route(
                GENERATE_WITH_TESTS,
                post(|Json(body): Json<Value>| async move {
                    // Only filled rows reach the service.
                    assert_eq!(body["samples"].as_array().unwrap().len(), 1);
                    assert_eq!(body["num_test_cases"], 2);
                    Json(json!({
                        "generated_prompt": "Translate English to Vietnamese.",
                        "test_cases": [
                            { "input": "cat", "expected_output": "mèo" },
                            { "input": "dog", "expected_output": "chó" }
                        ],
                        "total_time": 2.1
                    }))
                }),
            )
            .route(
                GENERATE_ITERATIVE,
                post(|Json(body): Json<Value>| async move {
                    assert_eq!(body["iteration"], 0);
                    Json(json!({
                        "generated_prompt": "Format: {}\n[Updated based on accuracy: 0.60]",
                        "test_cases": [{ "input": "Test input 0", "expected_output": "Expected output 0",
                                         "actual_output": "Expected output 0", "is_correct": true,
                                         "similarity_score": 1.0 }],
                        "accuracy": 1.0,
                        "response_time": 0.01,
                        "iteration": 1,
                        "optimization_history": [
                            { "iteration": 0, "accuracy": 0.6, "response_time": 0.01 },
                            { "iteration": 1, "accuracy": 1.0, "response_time": 0.01 }
                        ]
                    }))
                }),
            )
            .route(
                RUN_PROMPT,
                post(|Json(body): Json<Value>| async move {
                    let cases: Vec<Value> = body["test_cases"]
                        .as_array()
                        .unwrap()
                        .iter()
                        .map(|c| {
                            let output = json!({ "input": c["input"], "output": "mèo", "response_time": 0.2 });
                            let mut c = c.clone();
                            c["prompt_output"] = output;
                            c
                        })
                        .collect();
                    Json(json!({ "test_cases": cases, "total_time": 0.4 }))
                }),
            )
            .route(
                EVALUATE_RESULTS,
                post(|Json(body): Json<Value>| async move {
                    let mut cases = body["test_cases"].as_array().unwrap().clone();
                    for c in cases.iter_mut() {
                        let correct = c["prompt_output"]["output"] == c["expected_output"];
                        c["is_correct"] = json!(correct);
                        c["similarity_score"] = json!(if correct { 1.0 } else { 0.25 });
                    }
                    Json(json!({ "accuracy": 0.5, "avg_similarity": 0.625, "test_cases": cases }))
                }),
            )
            .route(
                FEEDBACK,
                post(|| async { Json(json!({ "message": "Feedback received successfully" })) }),
            )
    }

    async fn wizard() -> (StubService, Wizard) {
        let service = StubService::start(stub_router()).await;
        let client = ApiClient::new(&settings_for(&service.base_url())).unwrap();
        (service, Wizard::new(client))
    }

    fn filled_session() -> Session {
        let mut session = Session::new();
        session.set_row(0, Some("hello".into()), Some("xin chào".into())).unwrap();
        session.add_row(InputOutputRow::default());
        session.set_num_test_cases(2).unwrap();
        session
    }

    #[tokio::test]
    async fn full_wizard_flow() {
        let (_service, wizard) = wizard().await;
        let mut session = filled_session();

        wizard.generate(&mut session).await.unwrap();
        assert_eq!(session.step, Step::Results);
        assert_eq!(session.prompt, "Translate English to Vietnamese.");
        assert_eq!(session.test_cases.len(), 2);

        wizard.run(&mut session).await.unwrap();
        assert_eq!(session.step, Step::Evaluation);
        assert_eq!(session.test_cases[1].output_text(), "mèo");

        wizard.evaluate(&mut session).await.unwrap();
        let evaluation = session.evaluation.as_ref().unwrap();
        assert_eq!(evaluation.accuracy, 0.5);
        assert!(session.test_cases[0].is_correct);
        assert!(!session.test_cases[1].is_correct);
        assert!(session.last_error.is_none());

        let message = wizard.feedback(&mut session, "too literal").await.unwrap();
        assert_eq!(message, "Feedback received successfully");
    }

    #[tokio::test]
    async fn iterative_generation_returns_history() {
        let (_service, wizard) = wizard().await;
        let mut session = filled_session();

        let history = wizard.generate_iterative(&mut session).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].accuracy, 1.0);
        assert_eq!(session.test_cases[0].output_text(), "Expected output 0");
        assert_eq!(session.step, Step::Results);
    }

    #[tokio::test]
    async fn validation_failures_are_recorded_without_calls() {
        let (_service, wizard) = wizard().await;
        let mut session = Session::new();

        let err = wizard.generate(&mut session).await.unwrap_err();
        assert!(matches!(err, WizardError::ValidationFailed(_)));
        assert!(session.last_error.as_deref().unwrap().contains("non-empty input/output pair"));

        assert!(wizard.run(&mut session).await.is_err());
        session.edit_prompt("Some prompt");
        assert!(wizard.evaluate(&mut session).await.is_err());
        assert!(wizard.feedback(&mut session, "  ").await.is_err());
        assert_eq!(session.step, Step::Input);
    }

    #[tokio::test]
    async fn unreachable_service_is_recorded() {
        let client = ApiClient::new(&settings_for("http://127.0.0.1:9")).unwrap();
        let wizard = Wizard::new(client);
        let mut session = filled_session();
        session.edit_prompt("p");
        session.add_test_case(TestCase::new("a", "b"));

        assert!(matches!(wizard.run(&mut session).await, Err(WizardError::ApiError(_))));
        assert!(session.last_error.as_deref().unwrap().starts_with("API Error"));
        assert_eq!(session.step, Step::Input);
    }
}
