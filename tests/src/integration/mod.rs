//! Cross-crate integration tests over a live in-memory fabric.

pub mod flow_balance;
pub mod properties;
pub mod scenarios;

#[cfg(test)]
pub(crate) mod harness {
    use mesh_runtime::{initialise, NodeOptions, Runtime, RuntimeConfig, Separator};

    /// A runtime with the monitor silenced, for deterministic scenarios.
    pub async fn quiet_runtime(separator: Separator) -> Runtime {
        let mut config = RuntimeConfig::default();
        config.separator = separator;
        config.flow_balance.enabled = false;
        initialise(config).await.expect("runtime initialise")
    }

    /// Node options with no accept policy.
    pub fn open() -> NodeOptions {
        NodeOptions::default()
    }
}
