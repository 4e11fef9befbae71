use serde::{Deserialize, Serialize};

/// Log output settings consumed by [`crate::logging::init_tracing`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "d_filter")]
    pub filter: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default = "d_true")]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: d_filter(),
            json: true,
        }
    }
}

fn d_filter() -> String {
    "info".into()
}
fn d_true() -> bool {
    true
}
