use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid gateway url {url:?}: {reason}")]
    InvalidGatewayUrl { url: String, reason: &'static str },

    // ── Trigger payloads ──
    #[error("malformed push event")]
    EventParse { source: serde_json::Error },

    #[error("push event is missing {field}")]
    EventField { field: &'static str },

    #[error("malformed garbage-collect request")]
    GarbageRequestParse { source: serde_json::Error },

    // ── Manifest ──
    #[error("failed to read manifest {path}")]
    ManifestRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse manifest {path}")]
    ManifestParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("manifest {path} declares no functions")]
    EmptyManifest { path: PathBuf },

    #[error("function '{function}' in {path}: {reason}")]
    InvalidFunction {
        path: PathBuf,
        function: String,
        reason: &'static str,
    },

    // ── Status document ──
    #[error("failed to serialize status document")]
    StatusEncode { source: serde_json::Error },
}
