use bridge_traits::PlatformKind;
use thiserror::Error;

/// Errors surfaced while wiring the core or driving a session through it.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Hosts without `desktop-shims` must inject their own transport.
    #[error("No HttpClient configured; inject one or enable the desktop-shims feature")]
    HttpClientMissing,

    #[error("{} support is not compiled in; enable the `{}` feature", .platform.display_name(), .platform.display_name().to_lowercase())]
    PlatformNotCompiled { platform: PlatformKind },

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error(transparent)]
    Sync(#[from] core_sync::SyncError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
