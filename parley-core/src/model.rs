//! The seam between chat sessions and the hosted model.
//!
//! Sessions only ever talk to an `Arc<dyn Model>`. [`gemini::Gemini`] is the
//! production implementation; [`crate::testing::ScriptedModel`] replays canned
//! replies in tests.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use gemini::{Content, Gemini};

pub use gemini::Error as ModelError;

/// Stream of text fragments from a streamed generation.
pub type FragmentStream = BoxStream<'static, Result<String, ModelError>>;

/// Core trait for text generation backends.
#[async_trait]
pub trait Model: Send + Sync {
    /// Generate a complete reply.
    async fn generate(&self, request: ModelRequest) -> Result<String, ModelError>;

    /// Generate a reply as a stream of text fragments.
    async fn stream(&self, request: ModelRequest) -> Result<FragmentStream, ModelError>;

    /// Model name, for logs and the status bar.
    fn name(&self) -> &str;
}

/// A generation request, independent of the backend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelRequest {
    /// Overrides the backend's default model.
    pub model: Option<String>,
    /// System instruction, sent apart from the turns.
    pub system: Option<String>,
    pub contents: Vec<Content>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<usize>,
}

impl ModelRequest {
    /// Single-turn request carrying a flat text prompt.
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            contents: vec![Content::user(text)],
            ..Default::default()
        }
    }

    /// Multi-turn request with a system instruction.
    pub fn conversation(system: impl Into<String>, contents: Vec<Content>) -> Self {
        Self {
            system: Some(system.into()),
            contents,
            ..Default::default()
        }
    }

    /// Apply per-session generation settings.
    pub fn with_settings(mut self, settings: &GenerationSettings) -> Self {
        if self.model.is_none() {
            self.model = settings.model.clone();
        }
        self.temperature = settings.temperature;
        self.max_output_tokens = settings.max_output_tokens;
        self
    }

    /// Total characters across all turns and the system instruction.
    pub fn prompt_chars(&self) -> usize {
        self.system.as_ref().map_or(0, |s| s.len())
            + self.contents.iter().map(|c| c.text.len()).sum::<usize>()
    }
}

/// Generation knobs shared by every request in a session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationSettings {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<usize>,
}

impl From<ModelRequest> for gemini::Request {
    fn from(request: ModelRequest) -> Self {
        let mut out = gemini::Request::new(request.contents);
        out.model = request.model;
        out.system = request.system;
        out.temperature = request.temperature;
        out.max_output_tokens = request.max_output_tokens;
        out
    }
}

#[async_trait]
impl Model for Gemini {
    async fn generate(&self, request: ModelRequest) -> Result<String, ModelError> {
        let response = Gemini::generate(self, &request.into()).await?;
        Ok(response.text)
    }

    async fn stream(&self, request: ModelRequest) -> Result<FragmentStream, ModelError> {
        let chunks = Gemini::stream(self, &request.into()).await?;
        Ok(chunks
            .filter_map(|chunk| async move {
                match chunk {
                    Ok(chunk) if chunk.text.is_empty() => None,
                    Ok(chunk) => Some(Ok(chunk.text)),
                    Err(e) => Some(Err(e)),
                }
            })
            .boxed())
    }

    fn name(&self) -> &str {
        self.model()
    }
}
