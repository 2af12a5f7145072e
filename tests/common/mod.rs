//! Shared test utilities: in-memory cache and a fake remote store

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use mentor_gateway::error::SyncFailure;
use mentor_gateway::{db, AnswerRecord, DbPool, Question, RemoteStore, Result};

/// Set up an in-memory test database
#[must_use]
pub fn setup_test_db() -> DbPool {
    db::init_memory().expect("failed to init test db")
}

/// In-memory remote document store with switchable failure injection
#[derive(Default)]
pub struct FakeRemote {
    questions: Mutex<HashMap<String, Vec<Question>>>,
    answers: Mutex<HashMap<String, Vec<AnswerRecord>>>,
    failure: Mutex<Option<SyncFailure>>,
}

impl FakeRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent remote call fail with the given failure
    pub fn set_failure(&self, failure: Option<SyncFailure>) {
        *self.failure.lock().unwrap() = failure;
    }

    /// Seed a remote custom question directly (as if another device wrote it)
    pub fn seed_question(&self, user_id: &str, question: Question) {
        self.questions
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_default()
            .push(question);
    }

    /// Seed a remote answer directly
    pub fn seed_answer(&self, user_id: &str, question_id: &str, answer: &str) {
        self.answers
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_default()
            .push(AnswerRecord {
                id: question_id.to_string(),
                answer: answer.to_string(),
            });
    }

    /// Remote answer for a question, if stored
    #[must_use]
    pub fn answer(&self, user_id: &str, question_id: &str) -> Option<String> {
        self.answers
            .lock()
            .unwrap()
            .get(user_id)?
            .iter()
            .find(|r| r.id == question_id)
            .map(|r| r.answer.clone())
    }

    fn check(&self) -> Result<()> {
        match *self.failure.lock().unwrap() {
            Some(failure) => Err(failure.into()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn list_questions(&self, user_id: &str) -> Result<Vec<Question>> {
        self.check()?;
        Ok(self
            .questions
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_answers(&self, user_id: &str) -> Result<Vec<AnswerRecord>> {
        self.check()?;
        Ok(self
            .answers
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert_question(&self, user_id: &str, question: &Question) -> Result<()> {
        self.check()?;
        let mut questions = self.questions.lock().unwrap();
        let list = questions.entry(user_id.to_string()).or_default();
        list.retain(|q| q.id != question.id);
        list.push(question.clone());
        Ok(())
    }

    async fn upsert_answer(&self, user_id: &str, question_id: &str, answer: &str) -> Result<()> {
        self.check()?;
        let mut answers = self.answers.lock().unwrap();
        let list = answers.entry(user_id.to_string()).or_default();
        list.retain(|r| r.id != question_id);
        list.push(AnswerRecord {
            id: question_id.to_string(),
            answer: answer.to_string(),
        });
        Ok(())
    }

    async fn delete_question(&self, user_id: &str, question_id: &str) -> Result<()> {
        self.check()?;
        if let Some(list) = self.questions.lock().unwrap().get_mut(user_id) {
            list.retain(|q| q.id != question_id);
        }
        if let Some(list) = self.answers.lock().unwrap().get_mut(user_id) {
            list.retain(|r| r.id != question_id);
        }
        Ok(())
    }
}
