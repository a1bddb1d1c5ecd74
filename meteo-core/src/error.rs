use reqwest::StatusCode;

/// Failure of a geocoding or weather lookup.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("City not found")]
    CityNotFound,

    #[error("Failed to reach {service}: {source}")]
    Network {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} request failed with status {status}: {body}")]
    Status {
        service: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("Failed to parse {service} JSON: {source}")]
    Parse {
        service: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unexpected observation time '{0}' in forecast response")]
    Timestamp(String),
}

pub type LookupResult<T> = Result<T, LookupError>;
