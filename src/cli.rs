use crate::api::client::ApiClient;
use crate::config::Settings;
use crate::core::model::{InputOutputRow, TestCase};
use crate::core::session::{MAX_TEST_CASES, MIN_TEST_CASES, Session};
use crate::core::stats::{Summary, percent};
use crate::error::WizardError;
use crate::orchestrator::Wizard;
use crate::{report, spreadsheet};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

/// Compose prompt-generation requests, run the generated prompt and review
/// its evaluation against a remote prompt service.
#[derive(Parser, Debug)]
#[command(name = "prompt-wizard", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Session file holding the wizard state.
    #[arg(long, global = true, env = "PROMPT_WIZARD_SESSION")]
    pub session: Option<PathBuf>,

    /// Base URL of the prompt service.
    #[arg(long, global = true, env = "PROMPT_WIZARD_API_URL")]
    pub api_url: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, global = true, env = "PROMPT_WIZARD_TIMEOUT_SECS")]
    pub timeout: Option<u64>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a new session.
    Init {
        /// Replace an existing session.
        #[arg(long)]
        force: bool,
    },
    /// Show the current step of the wizard.
    Show,
    /// Set the JSON input describing the expected output format.
    Format(TextArgs),
    /// Set the conditions the prompt must respect.
    Conditions(TextArgs),
    /// Set how many test cases the service should generate.
    TestCount {
        #[arg(value_parser = clap::value_parser!(u32).range(MIN_TEST_CASES as i64..=MAX_TEST_CASES as i64))]
        count: u32,
    },
    /// Edit the input/output example rows.
    #[command(subcommand)]
    Row(RowCommand),
    /// Replace the example rows with those of a spreadsheet.
    ImportSamples {
        path: PathBuf,
        /// Append instead of replacing.
        #[arg(long)]
        append: bool,
    },
    /// Generate the prompt and test cases (step 1 -> 2).
    #[command(alias = "gen")]
    Generate {
        /// Use the iterative endpoint that refines the prompt in rounds.
        #[arg(long)]
        iterative: bool,
    },
    /// Show or edit the generated prompt.
    #[command(subcommand)]
    Prompt(PromptCommand),
    /// Edit the generated test cases.
    #[command(subcommand)]
    Case(CaseCommand),
    /// Replace the test cases with those of a spreadsheet.
    ImportCases { path: PathBuf },
    /// Run the prompt against the test cases (step 2 -> 3).
    Run,
    /// Ask the service to evaluate the run.
    #[command(alias = "eval")]
    Evaluate,
    /// Write test cases and evaluation summary to a spreadsheet.
    Export { path: PathBuf },
    /// Send free-form feedback about the current prompt.
    Feedback { text: String },
    /// Go back one step.
    Back,
    /// Print the JSON schema of the session file.
    Schema,
}

#[derive(Args, Debug)]
pub struct TextArgs {
    /// Literal text.
    #[arg(conflicts_with = "file", required_unless_present = "file")]
    pub text: Option<String>,
    /// Read the text from a file.
    #[arg(long)]
    pub file: Option<PathBuf>,
}

impl TextArgs {
    fn resolve(self) -> Result<String, WizardError> {
        match (self.text, self.file) {
            (Some(text), _) => Ok(text),
            (None, Some(path)) => Ok(fs::read_to_string(path)?),
            (None, None) => Ok(String::new()),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum RowCommand {
    /// Append a row.
    Add {
        #[arg(long, default_value = "")]
        input: String,
        #[arg(long, default_value = "")]
        output: String,
    },
    /// Change a row (1-based index).
    Set {
        index: usize,
        #[arg(long)]
        input: Option<String>,
        #[arg(long)]
        output: Option<String>,
    },
    /// Delete a row (1-based index).
    Remove { index: usize },
}

#[derive(Subcommand, Debug)]
pub enum PromptCommand {
    /// Print the prompt.
    Show,
    /// Replace the prompt.
    Set(TextArgs),
}

#[derive(Subcommand, Debug)]
pub enum CaseCommand {
    /// Append a test case.
    Add {
        #[arg(long, default_value = "")]
        input: String,
        #[arg(long, default_value = "")]
        expected: String,
    },
    /// Change a test case (1-based index).
    Set {
        index: usize,
        #[arg(long)]
        input: Option<String>,
        #[arg(long)]
        expected: Option<String>,
    },
    /// Delete a test case (1-based index).
    Remove { index: usize },
}

impl Cli {
    pub fn settings(&self) -> Settings {
        Settings::new(self.api_url.clone(), self.timeout, self.session.clone())
    }
}

pub async fn run(cli: Cli) -> Result<(), WizardError> {
    let settings = cli.settings();
    let path = settings.session_path.clone();

    if let Command::Init { force } = cli.command {
        if path.exists() && !force {
            return Err(WizardError::SessionError(format!(
                "{} already exists; pass --force to replace it",
                path.display()
            )));
        }
        let session = Session::new();
        session.save(&path)?;
        println!("Started session {} at {}", session.id, path.display());
        return Ok(());
    }
    if let Command::Schema = cli.command {
        let schema = schemars::schema_for!(Session);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let mut session = Session::load(&path)?;
    let outcome = apply(cli.command, &mut session, &settings).await;
    // Failed service calls are kept in the session so `show` can display them.
    session.save(&path)?;
    outcome
}

async fn apply(command: Command, session: &mut Session, settings: &Settings) -> Result<(), WizardError> {
    match command {
        Command::Init { .. } | Command::Schema => {}
        Command::Show => print!("{}", report::session_overview(session)),
        Command::Format(args) => {
            session.set_json_input(args.resolve()?);
            println!("JSON input updated.");
        }
        Command::Conditions(args) => {
            session.set_conditions(args.resolve()?);
            println!("Conditions updated.");
        }
        Command::TestCount { count } => {
            session.set_num_test_cases(count)?;
            println!("Will request {count} test cases.");
        }
        Command::Row(cmd) => match cmd {
            RowCommand::Add { input, output } => {
                session.add_row(InputOutputRow::new(input, output));
                println!("Added row #{}.", session.rows.len());
            }
            RowCommand::Set { index, input, output } => {
                session.set_row(to_zero_based(index)?, input, output)?;
                println!("Row #{index} updated.");
            }
            RowCommand::Remove { index } => {
                session.delete_row(to_zero_based(index)?)?;
                println!("Row #{index} removed.");
            }
        },
        Command::ImportSamples { path, append } => {
            let rows = spreadsheet::import_samples(&path)?;
            let count = rows.len();
            if !append {
                session.rows.clear();
            }
            session.rows.extend(rows);
            println!("Imported {count} rows.");
        }
        Command::Generate { iterative } => {
            let wizard = wizard(settings)?;
            if iterative {
                let history = wizard.generate_iterative(session).await?;
                for step in &history {
                    println!(
                        "  iteration {:>2}: accuracy {} ({:.2}s)",
                        step.iteration,
                        percent(step.accuracy),
                        step.response_time
                    );
                }
            } else {
                wizard.generate(session).await?;
            }
            print!("{}", report::session_overview(session));
        }
        Command::Prompt(cmd) => match cmd {
            PromptCommand::Show => println!("{}", session.prompt),
            PromptCommand::Set(args) => {
                session.edit_prompt(args.resolve()?);
                println!("Prompt updated.");
            }
        },
        Command::Case(cmd) => match cmd {
            CaseCommand::Add { input, expected } => {
                session.add_test_case(TestCase::new(input, expected));
                println!("Added test case #{}.", session.test_cases.len());
            }
            CaseCommand::Set { index, input, expected } => {
                session.edit_test_case(to_zero_based(index)?, input, expected)?;
                println!("Test case #{index} updated.");
            }
            CaseCommand::Remove { index } => {
                session.delete_test_case(to_zero_based(index)?)?;
                println!("Test case #{index} removed.");
            }
        },
        Command::ImportCases { path } => {
            session.test_cases = spreadsheet::import_test_cases(&path)?;
            session.evaluation = None;
            println!("Imported {} test cases.", session.test_cases.len());
        }
        Command::Run => {
            wizard(settings)?.run(session).await?;
            print!("{}", report::session_overview(session));
        }
        Command::Evaluate => {
            wizard(settings)?.evaluate(session).await?;
            print!("{}", report::session_overview(session));
        }
        Command::Export { path } => {
            spreadsheet::export_results(&path, &session.test_cases, session.evaluation.as_ref())?;
            let summary = match &session.evaluation {
                Some(result) => Summary::from_evaluation(result),
                None => Summary::from_test_cases(&session.test_cases),
            };
            println!("Wrote {} ({}/{} passed).", path.display(), summary.passed, summary.total());
        }
        Command::Feedback { text } => {
            let message = wizard(settings)?.feedback(session, &text).await?;
            println!("{message}");
        }
        Command::Back => {
            let step = session.go_back();
            println!("{}", report::step_indicator(step));
        }
    }
    Ok(())
}

fn wizard(settings: &Settings) -> Result<Wizard, WizardError> {
    let client = ApiClient::new(settings)?;
    log::debug!("Using prompt service at {}", client.base_url());
    Ok(Wizard::new(client))
}

fn to_zero_based(index: usize) -> Result<usize, WizardError> {
    index
        .checked_sub(1)
        .ok_or_else(|| WizardError::ValidationFailed("indices start at 1".into()))
}
