use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("unknown language '{0}'")]
    UnknownLanguage(String),
    #[error("unknown preset '{0}'")]
    UnknownPreset(String),
}
