//! Collaborator seams. The pipeline reaches the network and the LLM provider
//! only through these traits; tests script them.

use async_trait::async_trait;

use propsift_common::{ArticleStub, PropsiftError};

/// Full article body plus whatever source attribution the page carried.
#[derive(Debug, Clone)]
pub struct FetchedArticle {
    pub content: String,
    pub source_name: Option<String>,
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch one listing page of the article index; None past the last page.
    async fn fetch_page(&self, page: u32) -> Result<Option<String>, PropsiftError>;

    async fn fetch_article(&self, url: &str) -> Result<FetchedArticle, PropsiftError>;
}

pub trait Lister: Send + Sync {
    fn extract_stubs(&self, html: &str) -> Vec<ArticleStub>;
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, PropsiftError>;
}

const SYSTEM_PROMPT: &str = "你是香港地產新聞分析助手,請嚴格按照指示的格式回答,不要添加任何解釋。";

#[async_trait]
impl LlmClient for ai_client::OpenAi {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, PropsiftError> {
        self.chat_completion(SYSTEM_PROMPT, prompt, max_tokens, temperature)
            .await
            .map_err(|e| PropsiftError::Llm(e.to_string()))
    }
}
