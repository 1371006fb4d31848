use std::path::Path;

/// Fatal, stage-level error.
///
/// Exit codes:
/// - `2`: configuration / usage
/// - `3`: a required input file is missing
/// - `4`: I/O, HTTP client setup, or write failure
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(2, message)
    }

    /// A stage cannot start because one of its input files is absent.
    pub fn missing_input(path: &Path, hint: &str) -> Self {
        Self::new(
            3,
            format!("Required input file not found: {}. {hint}", path.display()),
        )
    }

    pub fn io(context: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        Self::new(4, format!("{context}: {err}"))
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn missing_input_names_the_file() {
        let err = AppError::missing_input(&PathBuf::from("data/worldbank_data.csv"), "Run `econ fetch` first.");
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("data/worldbank_data.csv"));
        assert!(err.message().ends_with("Run `econ fetch` first."));
    }
}
