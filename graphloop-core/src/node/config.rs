/// Configuration for node execution
///
/// Nodes are never retried by the driver; a failed or timed-out node ends the
/// run and the caller decides whether to try again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    /// Timeout for node execution in seconds
    pub timeout: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self { timeout: 30 }
    }
}

/// Builder for node configuration
#[derive(Debug, Default)]
pub struct NodeConfigBuilder {
    config: NodeConfig,
}

impl NodeConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: NodeConfig::default(),
        }
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.config.timeout = seconds;
        self
    }

    pub fn build(self) -> NodeConfig {
        self.config
    }
}
