use crate::core::model::TestCase;
use crate::core::session::{Session, Step};
use crate::core::stats::{Summary, percent};
use std::fmt::Write;

const CELL_WIDTH: usize = 32;
const CHART_WIDTH: usize = 40;

pub fn step_indicator(current: Step) -> String {
    Step::ALL
        .iter()
        .map(|&step| {
            let marker = if step.is_completed(current) {
                "✓".to_string()
            } else {
                step.number().to_string()
            };
            if step == current {
                format!("[{marker}] {}", step.title())
            } else {
                format!("({marker}) {}", step.title())
            }
        })
        .collect::<Vec<_>>()
        .join("  >  ")
}

pub fn results_table(cases: &[TestCase]) -> String {
    let header = ["#", "Input", "Expected Output", "Prompt Output", "Status"];
    let rows: Vec<[String; 5]> = cases
        .iter()
        .enumerate()
        .map(|(i, c)| {
            [
                (i + 1).to_string(),
                clip(&c.input),
                clip(&c.expected_output),
                clip(c.output_text()),
                c.status_label().to_string(),
            ]
        })
        .collect();

    let mut widths = header.map(|h| h.chars().count());
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &header.map(String::from), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("-+-"));
    for row in &rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String; 5], widths: &[usize; 5]) {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths.iter())
        .map(|(c, w)| format!("{c:<w$}", w = *w))
        .collect();
    let _ = writeln!(out, "{}", padded.join(" | ").trim_end());
}

/// Text stand-in for the pass/fail doughnut.
pub fn pass_fail_chart(summary: &Summary) -> String {
    let total = summary.total();
    let filled = if total == 0 {
        0
    } else {
        ((summary.passed as f64 / total as f64) * CHART_WIDTH as f64).round() as usize
    };
    format!(
        "Passed {:>3} [{}{}] {:<3} Failed",
        summary.passed,
        "█".repeat(filled),
        "░".repeat(CHART_WIDTH - filled),
        summary.failed
    )
}

pub fn summary_block(summary: &Summary) -> String {
    format!(
        "{}\nAccuracy:           {}\nAverage Similarity: {}",
        pass_fail_chart(summary),
        percent(summary.accuracy),
        percent(summary.avg_similarity)
    )
}

pub fn session_overview(session: &Session) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}\n", step_indicator(session.step));

    match session.step {
        Step::Input => {
            let _ = writeln!(out, "JSON Input:\n{}\n", or_placeholder(&session.json_input));
            let _ = writeln!(out, "Input-Output Examples:");
            for (i, row) in session.rows.iter().enumerate() {
                let _ = writeln!(out, "  {}. {}  =>  {}", i + 1, or_placeholder(&row.input), or_placeholder(&row.output));
            }
            let _ = writeln!(out, "\nConditions:\n{}\n", or_placeholder(&session.conditions));
            let _ = writeln!(out, "Test Cases: {}", session.num_test_cases);
        }
        Step::Results => {
            let _ = writeln!(out, "Generated Prompt:\n{}\n", or_placeholder(&session.prompt));
            let _ = writeln!(out, "Generated Test Cases:");
            for (i, case) in session.test_cases.iter().enumerate() {
                let _ = writeln!(out, "  {}. {}  =>  {}", i + 1, or_placeholder(&case.input), or_placeholder(&case.expected_output));
            }
        }
        Step::Evaluation => {
            let _ = writeln!(out, "Evaluation Results:");
            out.push_str(&results_table(&session.test_cases));
            match &session.evaluation {
                Some(result) => {
                    let _ = writeln!(out, "\n{}", summary_block(&Summary::from_evaluation(result)));
                }
                None => {
                    let _ = writeln!(out, "\nNot evaluated yet; run `evaluate`.");
                }
            }
        }
    }

    if let Some(err) = &session.last_error {
        let _ = writeln!(out, "\nError: {err}");
    }
    out
}

fn clip(s: &str) -> String {
    let flat = s.replace(['\n', '\r'], " ");
    if flat.chars().count() > CELL_WIDTH {
        let head: String = flat.chars().take(CELL_WIDTH - 1).collect();
        format!("{head}…")
    } else {
        flat
    }
}

fn or_placeholder(s: &str) -> &str {
    if s.trim().is_empty() { "(empty)" } else { s }
}
