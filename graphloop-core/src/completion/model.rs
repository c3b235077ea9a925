use crate::types::{GraphError, GraphResult, Message, ModelError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Per-call options understood by every model capability
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ModelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Sets the sampling temperature; must lie in `[0, 1]`.
    pub fn temperature(mut self, temperature: f32) -> GraphResult<Self> {
        if !(0.0..=1.0).contains(&temperature) {
            return Err(GraphError::InvalidConfig(format!(
                "temperature must be within [0, 1], got {}",
                temperature
            )));
        }
        self.temperature = Some(temperature);
        Ok(self)
    }
}

/// The injected model-call capability.
///
/// Implementations turn a conversation into the next assistant message,
/// possibly carrying tool-call requests. They must bound their own network
/// calls and report timeouts as [`ModelError::Transient`].
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn invoke(
        &self,
        messages: &[Message],
        options: &ModelOptions,
    ) -> Result<Message, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temperature_bounds() {
        assert!(ModelOptions::new().temperature(0.0).is_ok());
        assert!(ModelOptions::new().temperature(1.0).is_ok());
        assert!(matches!(
            ModelOptions::new().temperature(1.5),
            Err(GraphError::InvalidConfig(_))
        ));
        assert!(ModelOptions::new().temperature(-0.1).is_err());
    }

    #[test]
    fn test_options_builder() {
        let options = ModelOptions::new().max_output_tokens(300).temperature(0.7).unwrap();
        assert_eq!(options.max_output_tokens, Some(300));
        assert_eq!(options.temperature, Some(0.7));
    }
}
