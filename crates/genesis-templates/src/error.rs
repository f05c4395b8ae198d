use thiserror::Error;

/// Errors raised while loading the template corpus
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to parse template file '{source_name}': {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    #[error("duplicate template '{category}.{name}'")]
    Duplicate { category: String, name: String },

    #[error("template '{category}.{name}' has empty code")]
    EmptyCode { category: String, name: String },
}
