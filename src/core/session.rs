use super::model::{EvaluationResult, InputOutputRow, TestCase};
use crate::error::WizardError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

pub const MIN_TEST_CASES: u32 = 1;
pub const MAX_TEST_CASES: u32 = 10;
pub const DEFAULT_TEST_CASES: u32 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    #[default]
    Input,
    Results,
    Evaluation,
}

impl Step {
    pub const ALL: [Step; 3] = [Step::Input, Step::Results, Step::Evaluation];

    pub fn number(self) -> u8 {
        match self {
            Step::Input => 1,
            Step::Results => 2,
            Step::Evaluation => 3,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Step::Input => "Generate Prompt & Test Cases",
            Step::Results => "Run Prompt",
            Step::Evaluation => "Evaluation",
        }
    }

    pub fn back(self) -> Step {
        match self {
            Step::Input | Step::Results => Step::Input,
            Step::Evaluation => Step::Results,
        }
    }

    /// Whether `self` lies before `current`.
    pub fn is_completed(self, current: Step) -> bool {
        self < current
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Session {
    pub id: Uuid,
    #[serde(default)]
    pub step: Step,
    #[serde(default)]
    pub json_input: String,
    #[serde(default)]
    pub rows: Vec<InputOutputRow>,
    #[serde(default)]
    pub conditions: String,
    #[serde(default = "default_test_cases")]
    pub num_test_cases: u32,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub evaluation: Option<EvaluationResult>,
    #[serde(default)]
    pub last_error: Option<String>,
}

fn default_test_cases() -> u32 {
    DEFAULT_TEST_CASES
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            step: Step::Input,
            json_input: String::new(),
            rows: vec![InputOutputRow::default()],
            conditions: String::new(),
            num_test_cases: DEFAULT_TEST_CASES,
            prompt: String::new(),
            test_cases: Vec::new(),
            evaluation: None,
            last_error: None,
        }
    }

    pub fn load(path: &Path) -> Result<Self, WizardError> {
        if !path.exists() {
            return Err(WizardError::SessionError(format!(
                "no session at {}; run `init` first",
                path.display()
            )));
        }
        let text = fs::read_to_string(path)?;
        let session: Session = serde_json::from_str(&text)?;
        check_test_case_count(session.num_test_cases)?;
        log::debug!("Loaded session {} from {}", session.id, path.display());
        Ok(session)
    }

    pub fn save(&self, path: &Path) -> Result<(), WizardError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::debug!("Saved session {} to {}", self.id, path.display());
        Ok(())
    }

    // --- Step 1: form fields ---

    pub fn set_json_input(&mut self, text: impl Into<String>) {
        let text = text.into();
        if !text.trim().is_empty() && serde_json::from_str::<serde_json::Value>(&text).is_err() {
            log::warn!("JSON input is not valid JSON; it will be sent as plain text");
        }
        self.json_input = text;
    }

    pub fn set_conditions(&mut self, text: impl Into<String>) {
        self.conditions = text.into();
    }

    pub fn set_num_test_cases(&mut self, n: u32) -> Result<(), WizardError> {
        check_test_case_count(n)?;
        self.num_test_cases = n;
        Ok(())
    }

    pub fn add_row(&mut self, row: InputOutputRow) {
        self.rows.push(row);
    }

    pub fn set_row(&mut self, index: usize, input: Option<String>, output: Option<String>) -> Result<(), WizardError> {
        let len = self.rows.len();
        let row = self
            .rows
            .get_mut(index)
            .ok_or_else(|| out_of_range("row", index, len))?;
        if let Some(input) = input {
            row.input = input;
        }
        if let Some(output) = output {
            row.output = output;
        }
        Ok(())
    }

    pub fn delete_row(&mut self, index: usize) -> Result<InputOutputRow, WizardError> {
        if index >= self.rows.len() {
            return Err(out_of_range("row", index, self.rows.len()));
        }
        Ok(self.rows.remove(index))
    }

    pub fn filled_samples(&self) -> Vec<InputOutputRow> {
        self.rows.iter().filter(|r| r.is_filled()).cloned().collect()
    }

    pub fn validate_inputs(&self) -> Result<(), WizardError> {
        if self.filled_samples().is_empty() {
            return Err(WizardError::ValidationFailed(
                "at least one non-empty input/output pair is required".into(),
            ));
        }
        Ok(())
    }

    // --- Step 2: prompt and test cases ---

    // Any local edit to the prompt or cases invalidates a stored evaluation.

    pub fn edit_prompt(&mut self, text: impl Into<String>) {
        self.prompt = text.into();
        self.evaluation = None;
    }

    pub fn add_test_case(&mut self, case: TestCase) {
        self.test_cases.push(case);
        self.evaluation = None;
    }

    pub fn edit_test_case(
        &mut self,
        index: usize,
        input: Option<String>,
        expected_output: Option<String>,
    ) -> Result<(), WizardError> {
        let len = self.test_cases.len();
        let case = self
            .test_cases
            .get_mut(index)
            .ok_or_else(|| out_of_range("test case", index, len))?;
        if let Some(input) = input {
            case.input = input;
        }
        if let Some(expected) = expected_output {
            case.expected_output = expected;
        }
        self.evaluation = None;
        Ok(())
    }

    pub fn delete_test_case(&mut self, index: usize) -> Result<TestCase, WizardError> {
        if index >= self.test_cases.len() {
            return Err(out_of_range("test case", index, self.test_cases.len()));
        }
        self.evaluation = None;
        Ok(self.test_cases.remove(index))
    }

    // --- Service results ---

    pub fn apply_generated(&mut self, prompt: String, test_cases: Vec<TestCase>) {
        self.prompt = prompt;
        self.test_cases = test_cases;
        self.evaluation = None;
        self.step = Step::Results;
        self.clear_error();
    }

    pub fn apply_run(&mut self, test_cases: Vec<TestCase>) {
        self.test_cases = test_cases;
        self.evaluation = None;
        self.step = Step::Evaluation;
        self.clear_error();
    }

    pub fn apply_evaluation(&mut self, result: EvaluationResult) {
        if !result.test_cases.is_empty() {
            self.test_cases = result.test_cases.clone();
        }
        self.evaluation = Some(result);
        self.step = Step::Evaluation;
        self.clear_error();
    }

    pub fn go_back(&mut self) -> Step {
        self.step = self.step.back();
        self.step
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }
}

fn check_test_case_count(n: u32) -> Result<(), WizardError> {
    if !(MIN_TEST_CASES..=MAX_TEST_CASES).contains(&n) {
        return Err(WizardError::ValidationFailed(format!(
            "number of test cases must be between {MIN_TEST_CASES} and {MAX_TEST_CASES}, got {n}"
        )));
    }
    Ok(())
}

fn out_of_range(what: &str, index: usize, len: usize) -> WizardError {
    WizardError::ValidationFailed(format!(
        "{what} #{} does not exist (there are {len})",
        index + 1
    ))
}
