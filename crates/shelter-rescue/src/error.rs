use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::intake::ImportError;
use crate::workflows::rescue::RescueError;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Import(ImportError),
    Dispatch(RescueError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Import(err) => write!(f, "intake error: {}", err),
            AppError::Dispatch(err) => write!(f, "dispatch error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Import(err) => Some(err),
            AppError::Dispatch(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<ImportError> for AppError {
    fn from(value: ImportError) -> Self {
        Self::Import(value)
    }
}

impl From<RescueError> for AppError {
    fn from(value: RescueError) -> Self {
        Self::Dispatch(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::rescue::ReportId;
    use std::error::Error;

    #[test]
    fn dispatch_errors_keep_their_source() {
        let err = AppError::from(RescueError::ReportClosed(ReportId("rpt-7".to_string())));

        assert_eq!(
            err.to_string(),
            "dispatch error: report rpt-7 is already resolved"
        );
        assert!(err.source().is_some());
    }
}
