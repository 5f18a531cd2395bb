/// Script construction errors
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("Script template has no '{placeholder}' substitution point")]
    MissingPlaceholder { placeholder: &'static str },

    #[error("Invalid link mode: {0}. Valid options: auto, shared, static")]
    InvalidLinkMode(String),
}

pub type Result<T> = std::result::Result<T, ScriptError>;
