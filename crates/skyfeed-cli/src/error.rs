use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] skyfeed_core::ValidationError),

    #[error(transparent)]
    Source(#[from] skyfeed_core::SourceError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<skyfeed_core::CoreError> for CliError {
    fn from(error: skyfeed_core::CoreError) -> Self {
        match error {
            skyfeed_core::CoreError::Validation(inner) => Self::Validation(inner),
            skyfeed_core::CoreError::Serialization(inner) => Self::Serialization(inner),
            skyfeed_core::CoreError::Io(inner) => Self::Io(inner),
        }
    }
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Source(_) => 3,
            Self::Command(_) | Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyfeed_core::{ProviderId, SourceError};

    #[test]
    fn exit_codes_separate_user_errors_from_upstream_failures() {
        let user =
            CliError::Validation(skyfeed_core::ValidationError::LatitudeOutOfRange { value: 95.0 });
        assert_eq!(user.exit_code(), 2);

        let upstream = CliError::Source(SourceError::missing_credentials(ProviderId::Openweather));
        assert_eq!(upstream.exit_code(), 3);

        assert_eq!(CliError::Command("boom".into()).exit_code(), 10);
    }
}
