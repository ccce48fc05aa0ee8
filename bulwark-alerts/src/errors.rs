/// Alert delivery errors
#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("Network error delivering to {destination}: {error}")]
    Network { destination: String, error: String },

    #[error("{destination} rejected alert with status {status}: {response}")]
    Rejected {
        destination: String,
        status: u16,
        response: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),
}
