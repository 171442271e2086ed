use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration error: missing [{}]; invalid [{}]", missing.join(", "), invalid.join("; "))]
    Invalid {
        missing: Vec<String>,
        invalid: Vec<String>,
    },

    #[error("env file error: {0}")]
    EnvFile(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionIdError {
    #[error("session id is empty")]
    Empty,

    #[error("session id contains a forbidden character or sequence: {0:?}")]
    Forbidden(String),
}
