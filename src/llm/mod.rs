//! Language-model collaborator boundary. The core treats the model as a
//! black box completing prompts; emissions for the inference call itself are
//! attributed through the physical-model estimator over the call duration.

mod openai;
mod workflows;

pub use openai::OpenAiModel;
pub use workflows::{CarbonAdvisor, GenerationReport, OptimizationReport};

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("no API credential configured ({env_var} unset)")]
    MissingCredential { env_var: &'static str },

    #[error("model API returned {status}: {msg}")]
    Api { status: u16, msg: String },

    #[error("model API unreachable: {msg}")]
    Transport { msg: String },

    #[error("model response carried no completion")]
    EmptyCompletion,
}

#[mockall::automock]
#[async_trait::async_trait]
pub trait CodeModel: std::fmt::Debug + Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String, ModelError>;
}
