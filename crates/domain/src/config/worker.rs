use serde::{Deserialize, Serialize};

/// Identity this worker presents to the control plane.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Worker name sent with every session activation. Defaults to a random
    /// `worker-<uuid>` so two unconfigured workers never collide.
    #[serde(default = "d_worker_name")]
    pub name: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: d_worker_name(),
        }
    }
}

fn d_worker_name() -> String {
    format!("worker-{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_name_is_generated() {
        let a = WorkerConfig::default();
        let b = WorkerConfig::default();
        assert!(a.name.starts_with("worker-"));
        assert_ne!(a.name, b.name);
    }

    #[test]
    fn explicit_name_parses() {
        let cfg: WorkerConfig = toml::from_str(r#"name = "edge-1""#).unwrap();
        assert_eq!(cfg.name, "edge-1");
    }
}
