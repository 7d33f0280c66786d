use thiserror::Error;

/// Boot-time catalog failure — always a `ConfigError` per §7: the caller
/// logs it and aborts the process rather than starting with partial data.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{file} contained no templates")]
    Empty { file: String },

    #[error("no tower template for kind {kind:?}")]
    MissingTowerKind { kind: &'static str },
}
