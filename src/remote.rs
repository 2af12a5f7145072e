//! Remote document store client
//!
//! Two per-user collections live under the store: `customQuestions` (full
//! question documents) and `answers` (`{id, answer}` pairs). The remote is
//! the durability source of truth; the local cache in `db` is a
//! performance/offline shim in front of it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SyncFailure;
use crate::model::Question;
use crate::Result;

/// A stored `{id, answer}` pair from the `answers` collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub id: String,
    pub answer: String,
}

/// Operations the reconciler needs from the remote document store
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List the user's custom question documents
    async fn list_questions(&self, user_id: &str) -> Result<Vec<Question>>;

    /// List the user's cached answer documents
    async fn list_answers(&self, user_id: &str) -> Result<Vec<AnswerRecord>>;

    /// Insert or replace a custom question document by id
    async fn upsert_question(&self, user_id: &str, question: &Question) -> Result<()>;

    /// Insert or replace an answer document by question id
    async fn upsert_answer(&self, user_id: &str, question_id: &str, answer: &str) -> Result<()>;

    /// Delete a custom question document and its answer document
    async fn delete_question(&self, user_id: &str, question_id: &str) -> Result<()>;
}

/// HTTP client for a JSON document store with per-user namespaced
/// collections
#[derive(Clone)]
pub struct DocumentStoreClient {
    base_url: String,
    client: reqwest::Client,
    auth_token: Option<String>,
}

impl DocumentStoreClient {
    /// Requests that outlive this deadline count as `Unavailable`
    const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

    /// Create a new client for the given store URL
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            auth_token: None,
        }
    }

    /// Attach the user's identity token to every request
    #[must_use]
    pub fn with_auth_token(mut self, token: String) -> Self {
        self.auth_token = Some(token);
        self
    }

    fn collection_url(&self, user_id: &str, collection: &str) -> String {
        format!("{}/users/{user_id}/{collection}", self.base_url)
    }

    fn document_url(&self, user_id: &str, collection: &str, id: &str) -> String {
        format!("{}/users/{user_id}/{collection}/{id}", self.base_url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    /// Send a request and classify any failure into the sync taxonomy
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| classify(e.status(), &e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify(Some(status), &body));
        }

        Ok(response)
    }
}

fn classify(status: Option<reqwest::StatusCode>, detail: &str) -> crate::Error {
    let failure = crate::Error::classify_remote(status);
    tracing::debug!(?status, detail, "remote store request failed");
    crate::Error::Sync(failure)
}

#[async_trait]
impl RemoteStore for DocumentStoreClient {
    async fn list_questions(&self, user_id: &str) -> Result<Vec<Question>> {
        let url = self.collection_url(user_id, "customQuestions");
        let response = self.send(self.client.get(&url)).await?;
        let questions = response
            .json()
            .await
            .map_err(|_| crate::Error::Sync(SyncFailure::Unavailable))?;
        Ok(questions)
    }

    async fn list_answers(&self, user_id: &str) -> Result<Vec<AnswerRecord>> {
        let url = self.collection_url(user_id, "answers");
        let response = self.send(self.client.get(&url)).await?;
        let answers = response
            .json()
            .await
            .map_err(|_| crate::Error::Sync(SyncFailure::Unavailable))?;
        Ok(answers)
    }

    async fn upsert_question(&self, user_id: &str, question: &Question) -> Result<()> {
        let url = self.document_url(user_id, "customQuestions", &question.id);
        self.send(self.client.put(&url).json(question)).await?;
        Ok(())
    }

    async fn upsert_answer(&self, user_id: &str, question_id: &str, answer: &str) -> Result<()> {
        let url = self.document_url(user_id, "answers", question_id);
        let record = AnswerRecord {
            id: question_id.to_string(),
            answer: answer.to_string(),
        };
        self.send(self.client.put(&url).json(&record)).await?;
        Ok(())
    }

    async fn delete_question(&self, user_id: &str, question_id: &str) -> Result<()> {
        let question_url = self.document_url(user_id, "customQuestions", question_id);
        self.send(self.client.delete(&question_url)).await?;

        let answer_url = self.document_url(user_id, "answers", question_id);
        self.send(self.client.delete(&answer_url)).await?;
        Ok(())
    }
}
