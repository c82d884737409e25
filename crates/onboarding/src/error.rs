use shared::error::ApiError;
use thiserror::Error;

use crate::wizard::WizardStep;

#[derive(Debug, Error)]
pub enum OnboardingError {
    #[error("submission is only available on the confirmation step (currently on {step:?})")]
    NotAtConfirmation { step: WizardStep },
    #[error("invalid server url '{url}': {source}")]
    InvalidServerUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    #[error("server rejected request to {endpoint}: {error}")]
    Api { endpoint: String, error: ApiError },
}

pub type Result<T, E = OnboardingError> = std::result::Result<T, E>;
