//! Reconciler: local-first question list with best-effort remote durability

use std::collections::HashMap;
use std::sync::Arc;

use crate::db::QuestionCache;
use crate::error::SyncFailure;
use crate::model::Question;
use crate::remote::RemoteStore;
use crate::{Error, Result};

use super::merge::{merge, MergeInput};

/// How the last sync went; `Clean` means the remote store answered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Clean,
    PermissionDenied,
    Unavailable,
}

impl SyncStatus {
    fn from_failure(failure: SyncFailure) -> Self {
        match failure {
            SyncFailure::PermissionDenied => Self::PermissionDenied,
            SyncFailure::Unavailable => Self::Unavailable,
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Clean => write!(f, "synced"),
            Self::PermissionDenied => write!(f, "offline (permission denied)"),
            Self::Unavailable => write!(f, "offline (store unavailable)"),
        }
    }
}

/// Result of a sync: the authoritative question list and whether it was
/// built against live remote data
#[derive(Debug)]
pub struct SyncOutcome {
    pub questions: Vec<Question>,
    pub status: SyncStatus,
}

/// Merges the fast local cache with the slower authoritative remote store
pub struct Reconciler {
    cache: QuestionCache,
    remote: Arc<dyn RemoteStore>,
    catalog: Vec<Question>,
}

impl Reconciler {
    /// Create a reconciler over the given cache and remote store
    #[must_use]
    pub fn new(cache: QuestionCache, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            cache,
            remote,
            catalog: crate::catalog::static_questions(),
        }
    }

    /// Build the user's question list, preferring live remote data and
    /// degrading to the local cache on any remote failure. Never fails on
    /// remote errors; read-repair writes complete before this returns.
    ///
    /// # Errors
    ///
    /// Returns an error only if the local cache itself fails.
    pub async fn sync(&self, user_id: &str) -> Result<SyncOutcome> {
        let local_answers = self.cache.answers(user_id)?;
        let tombstones = self.cache.tombstones(user_id)?;

        let remote_data = self.fetch_remote(user_id).await;

        let (custom, remote_answers, status) = match remote_data {
            Ok((mut questions, answers)) => {
                // Persist the remote custom list locally so an offline
                // reload still sees it
                for question in &questions {
                    if !tombstones.contains(&question.id) {
                        self.cache.upsert_custom(user_id, question)?;
                    }
                }
                // Local questions the remote never saw (their add-time
                // write failed) stay in the list and get pushed again
                for local in self.cache.list_custom(user_id)? {
                    if questions.iter().all(|q| q.id != local.id) {
                        if let Err(e) = self.remote.upsert_question(user_id, &local).await {
                            tracing::warn!(question = %local.id, error = %e, "remote question re-push failed");
                        }
                        questions.push(local);
                    }
                }
                (questions, answers, SyncStatus::Clean)
            }
            Err(failure) => {
                tracing::warn!(user = user_id, status = %failure, "remote sync degraded");
                (
                    self.cache.list_custom(user_id)?,
                    HashMap::new(),
                    SyncStatus::from_failure(failure),
                )
            }
        };

        let merged = merge(
            &self.catalog,
            MergeInput {
                custom,
                local_answers,
                remote_answers,
                tombstones,
            },
        );

        for repair in &merged.repairs {
            self.cache
                .set_answer(user_id, &repair.question_id, &repair.answer)?;
        }
        if !merged.repairs.is_empty() {
            tracing::debug!(count = merged.repairs.len(), "read-repaired local answer cache");
        }

        Ok(SyncOutcome {
            questions: merged.questions,
            status,
        })
    }

    /// Create a custom question: unconditional local write, best-effort
    /// remote write, returned immediately for local use
    ///
    /// # Errors
    ///
    /// Returns an error only if the local cache write fails.
    pub async fn add_question(&self, user_id: &str, text: &str) -> Result<Question> {
        let question = Question::custom(text);

        if let Err(e) = self.remote.upsert_question(user_id, &question).await {
            tracing::warn!(question = %question.id, error = %e, "remote question write failed");
        }

        self.cache.upsert_custom(user_id, &question)?;
        tracing::info!(question = %question.id, "custom question added");
        Ok(question)
    }

    /// Record a generated answer: best-effort remote upsert, unconditional
    /// local write. Idempotent; safe to retry.
    ///
    /// # Errors
    ///
    /// Returns an error only if the local cache write fails.
    pub async fn record_answer(&self, user_id: &str, question_id: &str, answer: &str) -> Result<()> {
        if let Err(e) = self.remote.upsert_answer(user_id, question_id, answer).await {
            tracing::warn!(question = question_id, error = %e, "remote answer write failed");
        }

        self.cache.set_answer(user_id, question_id, answer)?;
        Ok(())
    }

    /// Delete a custom question everywhere: local list, local answer cache
    /// and the remote collection. The caller must have confirmed the
    /// irreversible delete with the user first.
    ///
    /// # Errors
    ///
    /// Returns an error only if the local cache delete fails.
    pub async fn delete_question(&self, user_id: &str, question_id: &str) -> Result<()> {
        self.cache.delete_question(user_id, question_id)?;

        if let Err(e) = self.remote.delete_question(user_id, question_id).await {
            // The local tombstone keeps the question from resurfacing
            tracing::warn!(question = question_id, error = %e, "remote delete failed");
        }

        tracing::info!(question = question_id, "question deleted");
        Ok(())
    }

    async fn fetch_remote(
        &self,
        user_id: &str,
    ) -> std::result::Result<(Vec<Question>, HashMap<String, String>), SyncFailure> {
        let questions = self
            .remote
            .list_questions(user_id)
            .await
            .map_err(unwrap_failure)?;
        let answers = self
            .remote
            .list_answers(user_id)
            .await
            .map_err(unwrap_failure)?;

        let answers = answers.into_iter().map(|r| (r.id, r.answer)).collect();
        Ok((questions, answers))
    }
}

fn unwrap_failure(error: Error) -> SyncFailure {
    match error {
        Error::Sync(failure) => failure,
        _ => SyncFailure::Unavailable,
    }
}
