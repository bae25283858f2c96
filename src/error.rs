use thiserror::Error;

#[derive(Error, Debug)]
pub enum WizardError {
    #[error("API Error: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Service Error ({status}): {detail}")]
    ServiceError { status: u16, detail: String },

    #[error("JSON Error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Spreadsheet Read Error: {0}")]
    SheetReadError(#[from] calamine::Error),

    #[error("Spreadsheet Write Error: {0}")]
    SheetWriteError(#[from] rust_xlsxwriter::XlsxError),

    #[error("Validation Failed: {0}")]
    ValidationFailed(String),

    #[error("Session Error: {0}")]
    SessionError(String),
}
