use crate::source::SourceId;

/// Failures reported by a [`SpectrumProvider`](crate::session::SpectrumProvider).
///
/// None of these are fatal: the session degrades the visualization instead of
/// stopping.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider could not attach to a source.
    #[error("could not connect to source {source_id}: {reason}")]
    Connect { source_id: SourceId, reason: String },
    /// Releasing a connection failed. Always swallowed by the session.
    #[error("could not disconnect: {0}")]
    Disconnect(String),
    /// No magnitudes are available for this tick.
    #[error("no spectrum data available")]
    SampleUnavailable,
}

/// Failures of the persisted settings store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("settings i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings file is not valid TOML: {0}")]
    Parse(#[from] toml_edit::TomlError),
    #[error("setting `{key}` holds an unusable value")]
    InvalidValue { key: &'static str },
}
