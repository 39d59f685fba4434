//! Azure OpenAI client for streaming chat completions.

use async_openai::{
    config::AzureConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use super::{ChatBackend, DeltaStream};
use crate::config::GenerationConfig;
use crate::prompts::{ChatMessage, Role};
use crate::{Error, Result};

/// Azure OpenAI chat client bound to one deployment.
#[derive(Debug, Clone)]
pub struct AzureChatClient {
    client: Client<AzureConfig>,
    deployment: String,
    temperature: f32,
}

impl AzureChatClient {
    /// Create client from the generation section of the config.
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        if !config.is_configured() {
            return Err(Error::Config(
                "AZURE_OPENAI_ENDPOINT and AZURE_OPENAI_API_KEY must be set".to_string(),
            ));
        }

        let azure = AzureConfig::new()
            .with_api_base(config.endpoint.trim_end_matches('/'))
            .with_api_version(&config.api_version)
            .with_deployment_id(&config.deployment)
            .with_api_key(&config.api_key);

        Ok(Self {
            client: Client::with_config(azure),
            deployment: config.deployment.clone(),
            temperature: config.temperature,
        })
    }

    /// Deployment (model) name.
    pub fn deployment(&self) -> &str {
        &self.deployment
    }
}

fn to_request_message(message: ChatMessage) -> Result<ChatCompletionRequestMessage> {
    let converted = match message.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(message.content)
            .build()?
            .into(),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(message.content)
            .build()?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(message.content)
            .build()?
            .into(),
    };
    Ok(converted)
}

#[async_trait]
impl ChatBackend for AzureChatClient {
    async fn stream_chat(&self, messages: Vec<ChatMessage>) -> Result<DeltaStream> {
        let count = messages.len();
        let messages = messages
            .into_iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.deployment)
            .messages(messages)
            .temperature(self.temperature)
            .stream(true)
            .build()?;

        debug!(
            deployment = %self.deployment,
            messages = count,
            "Starting streaming completion"
        );
        let stream = self.client.chat().create_stream(request).await?;

        let deltas = stream.map(|item| {
            item.map(|chunk| {
                chunk
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|choice| choice.delta.content)
            })
            .map_err(Error::from)
        });

        Ok(Box::pin(deltas))
    }
}
