use thiserror::Error;

#[derive(Error, Debug)]
pub enum PropsiftError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
