//! REST implementation of [`ChatHistory`].

use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Deserialize;
use url::Url;

use crate::chat::core::config::ApiConfig;
use crate::chat::core::credentials::AuthToken;
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::{ChatId, MessageId};
use crate::chat::core::message::Feedback;
use crate::chat::sessions::history::{
    ChatHistory, CreateSessionRequest, FeedbackRequest, HistoryFuture, SessionDetail, SessionPage,
    SessionSummary,
};

/// Body returned by the create endpoint; timestamps may be omitted.
#[derive(Debug, Deserialize)]
struct CreatedSession {
    id: ChatId,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, alias = "createdAt")]
    created_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "updatedAt")]
    updated_at: Option<DateTime<Utc>>,
}

impl CreatedSession {
    fn into_summary(self, requested_title: &str) -> SessionSummary {
        let now = Utc::now();
        SessionSummary {
            id: self.id,
            title: self.title.unwrap_or_else(|| requested_title.to_string()),
            created_at: self.created_at.or(Some(now)),
            updated_at: self.updated_at.or(self.created_at).unwrap_or(now),
        }
    }
}

/// Chat history backed by the EnterpriseGPT REST API.
#[derive(Clone, Debug)]
pub struct HttpChatHistory {
    client: reqwest::Client,
    base_url: String,
    token: AuthToken,
    page: u32,
    page_size: u32,
}

impl HttpChatHistory {
    /// Create a client for the given API settings.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &ApiConfig, token: AuthToken) -> ChatResult<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url)?;
        let client = Self::build_client(config)?;

        Ok(Self {
            client,
            base_url,
            token,
            page: config.page,
            page_size: config.page_size,
        })
    }

    fn build_client(config: &ApiConfig) -> ChatResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Ok(reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout())
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()?)
    }

    fn endpoint(&self, path: &str) -> ChatResult<Url> {
        Ok(Url::parse(&format!("{}{path}", self.base_url))?)
    }

    fn list_url(&self) -> ChatResult<Url> {
        let mut url = self.endpoint("/api/chat/")?;
        url.query_pairs_mut()
            .append_pair("page", &self.page.to_string())
            .append_pair("limit", &self.page_size.to_string());
        Ok(url)
    }

    fn session_url(&self, id: &ChatId) -> ChatResult<Url> {
        let mut url = self.endpoint("/api/chat")?;
        url.path_segments_mut()
            .map_err(|()| ChatError::InvalidConfig("api.base_url cannot be a base".to_string()))?
            .push(id.as_str());
        Ok(url)
    }

    async fn list(&self) -> ChatResult<Vec<SessionSummary>> {
        let url = self.list_url()?;
        tracing::debug!(url = %url, "listing chat sessions");

        let response = self
            .client
            .get(url)
            .bearer_auth(self.token.expose())
            .send()
            .await?;
        let page: SessionPage = ensure_success(response, "listing chats").await?.json().await?;

        tracing::debug!(count = page.chats.len(), total = page.total, "chat sessions listed");
        Ok(page.chats)
    }

    async fn fetch(&self, id: ChatId) -> ChatResult<SessionDetail> {
        let url = self.session_url(&id)?;
        tracing::debug!(chat_id = %id, "fetching chat session");

        let response = self
            .client
            .get(url)
            .bearer_auth(self.token.expose())
            .send()
            .await?;
        Ok(ensure_success(response, "fetching chat").await?.json().await?)
    }

    async fn create(&self, title: String) -> ChatResult<SessionSummary> {
        let url = self.endpoint("/api/chat")?;
        let body = CreateSessionRequest {
            title: title.clone(),
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(self.token.expose())
            .json(&body)
            .send()
            .await?;
        let created: CreatedSession = ensure_success(response, "creating chat")
            .await?
            .json()
            .await?;

        tracing::info!(chat_id = %created.id, "chat session created");
        Ok(created.into_summary(&title))
    }

    async fn feedback(&self, message_id: MessageId, feedback: Feedback) -> ChatResult<()> {
        let remote = match &message_id {
            MessageId::Remote(id) => id.clone(),
            MessageId::Local(_) => {
                return Err(ChatError::UnconfirmedMessage(message_id.to_string()));
            }
        };
        let url = self.endpoint("/api/chat/feedback")?;
        let body = FeedbackRequest {
            message_id: remote,
            feedback: feedback.score(),
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(self.token.expose())
            .json(&body)
            .send()
            .await?;
        ensure_success(response, "submitting feedback").await?;

        tracing::debug!(message_id = %message_id, feedback = %feedback, "feedback submitted");
        Ok(())
    }
}

impl ChatHistory for HttpChatHistory {
    fn list_sessions(&self) -> HistoryFuture<'_, Vec<SessionSummary>> {
        Box::pin(self.list())
    }

    fn fetch_session(&self, id: &ChatId) -> HistoryFuture<'_, SessionDetail> {
        let id = id.clone();
        Box::pin(async move { self.fetch(id).await })
    }

    fn create_session(&self, title: &str) -> HistoryFuture<'_, SessionSummary> {
        let title = title.to_string();
        Box::pin(async move { self.create(title).await })
    }

    fn submit_feedback(
        &self,
        message_id: &MessageId,
        feedback: Feedback,
    ) -> HistoryFuture<'_, ()> {
        let message_id = message_id.clone();
        Box::pin(async move { self.feedback(message_id, feedback).await })
    }
}

/// Map non-2xx responses to [`ChatError::Api`].
async fn ensure_success(
    response: reqwest::Response,
    context: &str,
) -> ChatResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), context, body = %body, "chat backend request failed");
    Err(ChatError::Api {
        status: status.as_u16(),
        context: context.to_string(),
    })
}
