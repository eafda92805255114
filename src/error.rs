use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("malformed profile: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid profile: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("cannot read script: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed script: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("step {index}: timestamps must not go backwards ({at_ms} ms after {prev_ms} ms)")]
    OutOfOrder { index: usize, at_ms: u64, prev_ms: u64 },
}
