use super::model::{EvaluationResult, TestCase};

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub accuracy: f64,
    pub avg_similarity: f64,
}

impl Summary {
    /// Counts come from the returned cases, the ratios from the service.
    pub fn from_evaluation(result: &EvaluationResult) -> Self {
        let (passed, failed) = tally(&result.test_cases);
        Self {
            passed,
            failed,
            accuracy: result.accuracy,
            avg_similarity: result.avg_similarity,
        }
    }

    pub fn from_test_cases(cases: &[TestCase]) -> Self {
        let (passed, failed) = tally(cases);
        let total = cases.len();
        if total == 0 {
            return Self { passed, failed, accuracy: 0.0, avg_similarity: 0.0 };
        }
        let similarity: f64 = cases.iter().map(|c| c.similarity_score).sum();
        Self {
            passed,
            failed,
            accuracy: passed as f64 / total as f64,
            avg_similarity: similarity / total as f64,
        }
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed
    }
}

fn tally(cases: &[TestCase]) -> (usize, usize) {
    let passed = cases.iter().filter(|c| c.is_correct).count();
    (passed, cases.len() - passed)
}

pub fn percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}
