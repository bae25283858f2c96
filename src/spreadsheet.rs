use crate::core::model::{EvaluationResult, InputOutputRow, PromptOutput, TestCase};
use crate::core::stats::{Summary, percent};
use crate::error::WizardError;
use calamine::{Data, Reader, open_workbook_auto};
use rust_xlsxwriter::{Format, Workbook};
use std::collections::HashMap;
use std::path::Path;

const CASES_SHEET: &str = "Test Cases";
const SUMMARY_SHEET: &str = "Summary";
const CASE_HEADERS: [&str; 5] = ["Input", "Expected Output", "Prompt Output", "Status", "Similarity Score"];

/// First sheet as a header-keyed table. Rows with no content are dropped.
struct Table {
    columns: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl Table {
    fn read(path: &Path) -> Result<Self, WizardError> {
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| WizardError::ValidationFailed(format!("{} has no worksheets", path.display())))??;

        let mut rows = range.rows();
        let header = rows
            .next()
            .ok_or_else(|| WizardError::ValidationFailed(format!("{} is empty", path.display())))?;
        let columns = header
            .iter()
            .enumerate()
            .map(|(i, cell)| (normalize_header(&cell_text(cell)), i))
            .filter(|(name, _)| !name.is_empty())
            .collect();

        let rows = rows
            .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
            .filter(|row| row.iter().any(|c| !c.trim().is_empty()))
            .collect();

        Ok(Self { columns, rows })
    }

    fn require(&self, name: &str) -> Result<(), WizardError> {
        if self.columns.contains_key(name) {
            Ok(())
        } else {
            Err(WizardError::ValidationFailed(format!("missing required column '{name}'")))
        }
    }

    fn cell<'a>(&self, row: &'a [String], name: &str) -> Option<&'a str> {
        self.columns
            .get(name)
            .and_then(|&i| row.get(i))
            .map(String::as_str)
    }

    fn text(&self, row: &[String], name: &str) -> String {
        self.cell(row, name).unwrap_or_default().to_string()
    }
}

pub fn import_samples(path: &Path) -> Result<Vec<InputOutputRow>, WizardError> {
    let table = Table::read(path)?;
    table.require("input")?;
    table.require("output")?;

    let samples: Vec<InputOutputRow> = table
        .rows
        .iter()
        .map(|row| InputOutputRow::new(table.text(row, "input"), table.text(row, "output")))
        .collect();
    log::info!("📥 Imported {} sample rows from {}", samples.len(), path.display());
    Ok(samples)
}

pub fn import_test_cases(path: &Path) -> Result<Vec<TestCase>, WizardError> {
    let table = Table::read(path)?;
    table.require("input")?;
    table.require("expected_output")?;

    let cases: Vec<TestCase> = table
        .rows
        .iter()
        .map(|row| {
            let output = table.text(row, "prompt_output");
            let is_correct = table
                .cell(row, "is_correct")
                .or_else(|| table.cell(row, "status"))
                .map(parse_flag)
                .unwrap_or(false);
            TestCase {
                input: table.text(row, "input"),
                expected_output: table.text(row, "expected_output"),
                prompt_output: (!output.is_empty()).then_some(PromptOutput::Text(output)),
                is_correct,
                similarity_score: table
                    .cell(row, "similarity_score")
                    .and_then(|s| s.trim().parse().ok())
                    .unwrap_or(0.0),
                ..Default::default()
            }
        })
        .collect();
    log::info!("📥 Imported {} test cases from {}", cases.len(), path.display());
    Ok(cases)
}

pub fn export_results(path: &Path, cases: &[TestCase], evaluation: Option<&EvaluationResult>) -> Result<(), WizardError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(CASES_SHEET)?;
    for (col, header) in CASE_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    for (i, case) in cases.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, &case.input)?;
        sheet.write_string(row, 1, &case.expected_output)?;
        sheet.write_string(row, 2, case.output_text())?;
        sheet.write_string(row, 3, case.status_label())?;
        sheet.write_number(row, 4, case.similarity_score)?;
    }

    if let Some(result) = evaluation {
        let summary = Summary::from_evaluation(result);
        let sheet = workbook.add_worksheet();
        sheet.set_name(SUMMARY_SHEET)?;
        sheet.write_string_with_format(0, 0, "Metric", &bold)?;
        sheet.write_string_with_format(0, 1, "Value", &bold)?;
        let lines = [
            ("Passed", summary.passed.to_string()),
            ("Failed", summary.failed.to_string()),
            ("Accuracy", percent(summary.accuracy)),
            ("Average Similarity", percent(summary.avg_similarity)),
        ];
        for (i, (name, value)) in lines.iter().enumerate() {
            sheet.write_string(i as u32 + 1, 0, *name)?;
            sheet.write_string(i as u32 + 1, 1, value)?;
        }
    }

    workbook.save(path)?;
    log::info!("📤 Exported {} test cases to {}", cases.len(), path.display());
    Ok(())
}

fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace([' ', '-'], "_")
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "passed" | "pass" | "true" | "yes" | "1"
    )
}
