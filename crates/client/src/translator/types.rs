//! Chat completions wire types.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<ChatMessage<'a>>,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

impl<'a> ChatMessage<'a> {
    pub fn system(content: &'a str) -> Self {
        Self { role: "system", content }
    }

    pub fn user(content: &'a str) -> Self {
        Self { role: "user", content }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Error envelope returned by OpenAI-compatible providers.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

impl ChatResponse {
    /// Why the first choice stopped, when the provider says.
    pub fn finish_reason(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.finish_reason.as_deref())
    }

    /// Content of the first choice, if it is non-blank.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_shape() {
        let req = ChatRequest {
            model: "google/gemini-2.0-flash-001",
            messages: vec![ChatMessage::system("brief"), ChatMessage::user("question")],
            temperature: 0.0,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "model": "google/gemini-2.0-flash-001",
                "messages": [{"role": "system", "content": "brief"}, {"role": "user", "content": "question"}],
                "temperature": 0.0
            })
        );
    }

    #[test]
    fn test_first_content() {
        let resp: ChatResponse = serde_json::from_value(
            json!({"choices": [{"message": {"content": "SELECT 1"}, "finish_reason": "stop"}]}),
        )
        .unwrap();
        assert_eq!(resp.first_content(), Some("SELECT 1"));
        assert_eq!(resp.finish_reason(), Some("stop"));

        let resp: ChatResponse = serde_json::from_value(json!({"choices": []})).unwrap();
        assert_eq!(resp.first_content(), None);

        let resp: ChatResponse =
            serde_json::from_value(json!({"choices": [{"message": {"content": null}}]})).unwrap();
        assert_eq!(resp.first_content(), None);

        let resp: ChatResponse = serde_json::from_value(json!({"id": "x"})).unwrap();
        assert_eq!(resp.first_content(), None);
    }
}
