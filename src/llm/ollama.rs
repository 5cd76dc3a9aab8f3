use crate::llm::client::{ChatMessage, ChatRole, LLMClient};
use crate::types::{AppError, Result};
use async_trait::async_trait;
use ollama_rs::{
    generation::chat::{request::ChatMessageRequest, ChatMessage as OllamaMessage},
    Ollama,
};

const DEFAULT_OLLAMA_PORT: u16 = 11434;

pub struct OllamaClient {
    client: Ollama,
    model: String,
}

impl OllamaClient {
    pub async fn new(base_url: String, model: String) -> Result<Self> {
        let (host, port) = split_host_port(&base_url);
        let client = Ollama::new(host, port);

        Ok(Self { client, model })
    }
}

/// Split `scheme://host:port` into `(scheme://host, port)`.
fn split_host_port(base_url: &str) -> (String, u16) {
    let trimmed = base_url.trim_end_matches('/');
    let (scheme, rest) = match trimmed.split_once("://") {
        Some((scheme, rest)) => (scheme, rest),
        None => ("http", trimmed),
    };

    match rest.rsplit_once(':') {
        Some((host, port)) => match port.parse() {
            Ok(port) => (format!("{}://{}", scheme, host), port),
            Err(_) => (format!("{}://{}", scheme, rest), DEFAULT_OLLAMA_PORT),
        },
        None => (format!("{}://{}", scheme, rest), DEFAULT_OLLAMA_PORT),
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn complete(&self, system: &str, messages: &[ChatMessage]) -> Result<String> {
        let mut chat_messages = vec![OllamaMessage::system(system.to_string())];
        chat_messages.extend(messages.iter().map(|m| match m.role {
            ChatRole::User => OllamaMessage::user(m.content.clone()),
            ChatRole::Assistant => OllamaMessage::assistant(m.content.clone()),
        }));

        let request = ChatMessageRequest::new(self.model.clone(), chat_messages);

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AppError::LLM(format!("Ollama error: {}", e)))?;

        Ok(response.message.content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_parsing_full() {
        let (host, port) = split_host_port("http://localhost:11434");
        assert_eq!(host, "http://localhost");
        assert_eq!(port, 11434);
    }

    #[test]
    fn test_url_parsing_no_port() {
        let (host, port) = split_host_port("http://localhost");
        assert_eq!(host, "http://localhost");
        assert_eq!(port, 11434);
    }

    #[test]
    fn test_url_parsing_custom_port() {
        let (host, port) = split_host_port("https://192.168.1.100:8080/");
        assert_eq!(host, "https://192.168.1.100");
        assert_eq!(port, 8080);
    }

    #[test]
    fn test_url_parsing_without_scheme() {
        let (host, port) = split_host_port("gpu-box:9000");
        assert_eq!(host, "http://gpu-box");
        assert_eq!(port, 9000);
    }
}
