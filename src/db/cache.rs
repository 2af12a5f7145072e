//! Per-user local cache repositories
//!
//! Keys combine user id and question id; the answer cache and the custom
//! question list are stored independently so either can be repaired from
//! remote data without touching the other.

use std::collections::HashSet;

use crate::db::DbPool;
use crate::model::Question;
use crate::{Error, Result};

/// Local cache for custom questions, answers and delete tombstones
#[derive(Clone)]
pub struct QuestionCache {
    db: DbPool,
}

impl QuestionCache {
    /// Create a cache backed by the given pool
    #[must_use]
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    fn conn(&self) -> Result<crate::db::DbConn> {
        self.db.get().map_err(|e| Error::Database(e.to_string()))
    }

    /// List the user's custom questions, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn list_custom(&self, user_id: &str) -> Result<Vec<Question>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT question_id, text, category FROM custom_questions
             WHERE user_id = ?1
             ORDER BY CAST(question_id AS INTEGER) DESC",
        )?;
        let questions = stmt
            .query_map(rusqlite::params![user_id], |row| {
                Ok(Question {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    category: row.get(2)?,
                    cached_answer: None,
                    is_custom: true,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(questions)
    }

    /// Insert or replace a custom question
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn upsert_custom(&self, user_id: &str, question: &Question) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO custom_questions (user_id, question_id, text, category)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, question_id) DO UPDATE SET
                text = excluded.text,
                category = excluded.category",
            rusqlite::params![user_id, question.id, question.text, question.category],
        )?;
        Ok(())
    }

    /// Get the cached answer for a question, if any
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn get_answer(&self, user_id: &str, question_id: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let result = conn.query_row(
            "SELECT answer FROM answers WHERE user_id = ?1 AND question_id = ?2",
            rusqlite::params![user_id, question_id],
            |row| row.get(0),
        );
        match result {
            Ok(answer) => Ok(Some(answer)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Insert or replace the cached answer for a question
    ///
    /// # Errors
    ///
    /// Returns an error if the database write fails.
    pub fn set_answer(&self, user_id: &str, question_id: &str, answer: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO answers (user_id, question_id, answer, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(user_id, question_id) DO UPDATE SET
                answer = excluded.answer,
                updated_at = excluded.updated_at",
            rusqlite::params![user_id, question_id, answer],
        )?;
        Ok(())
    }

    /// All cached answers for a user, keyed by question id
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn answers(&self, user_id: &str) -> Result<std::collections::HashMap<String, String>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT question_id, answer FROM answers WHERE user_id = ?1")?;
        let answers = stmt
            .query_map(rusqlite::params![user_id], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<std::result::Result<std::collections::HashMap<_, _>, _>>()?;
        Ok(answers)
    }

    /// Tombstoned question ids for a user
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub fn tombstones(&self, user_id: &str) -> Result<HashSet<String>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT question_id FROM deleted_questions WHERE user_id = ?1")?;
        let ids = stmt
            .query_map(rusqlite::params![user_id], |row| row.get(0))?
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    /// Remove a question, its cached answer and any future claim on it, in
    /// one transaction: question row, answer row, plus a tombstone so stale
    /// remote data cannot resurrect it
    ///
    /// # Errors
    ///
    /// Returns an error if the database transaction fails.
    pub fn delete_question(&self, user_id: &str, question_id: &str) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM custom_questions WHERE user_id = ?1 AND question_id = ?2",
            rusqlite::params![user_id, question_id],
        )?;
        tx.execute(
            "DELETE FROM answers WHERE user_id = ?1 AND question_id = ?2",
            rusqlite::params![user_id, question_id],
        )?;
        tx.execute(
            "INSERT OR IGNORE INTO deleted_questions (user_id, question_id) VALUES (?1, ?2)",
            rusqlite::params![user_id, question_id],
        )?;
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cache() -> QuestionCache {
        QuestionCache::new(crate::db::init_memory().unwrap())
    }

    #[test]
    fn custom_questions_list_newest_first() {
        let cache = test_cache();
        for (id, text) in [("100", "oldest"), ("300", "newest"), ("200", "middle")] {
            let q = Question {
                id: id.to_string(),
                text: text.to_string(),
                category: Some("Custom".to_string()),
                cached_answer: None,
                is_custom: true,
            };
            cache.upsert_custom("u1", &q).unwrap();
        }

        let listed = cache.list_custom("u1").unwrap();
        let ids: Vec<&str> = listed.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, ["300", "200", "100"]);
    }

    #[test]
    fn answers_are_scoped_per_user() {
        let cache = test_cache();
        cache.set_answer("alice", "q1", "alice's answer").unwrap();
        assert_eq!(
            cache.get_answer("alice", "q1").unwrap().as_deref(),
            Some("alice's answer")
        );
        assert!(cache.get_answer("bob", "q1").unwrap().is_none());
    }

    #[test]
    fn set_answer_is_idempotent() {
        let cache = test_cache();
        cache.set_answer("u1", "q1", "the answer").unwrap();
        cache.set_answer("u1", "q1", "the answer").unwrap();
        assert_eq!(
            cache.get_answer("u1", "q1").unwrap().as_deref(),
            Some("the answer")
        );
    }

    #[test]
    fn delete_removes_question_answer_and_leaves_tombstone() {
        let cache = test_cache();
        let q = Question::custom("to be deleted");
        cache.upsert_custom("u1", &q).unwrap();
        cache.set_answer("u1", &q.id, "stale").unwrap();

        cache.delete_question("u1", &q.id).unwrap();

        assert!(cache.list_custom("u1").unwrap().is_empty());
        assert!(cache.get_answer("u1", &q.id).unwrap().is_none());
        assert!(cache.tombstones("u1").unwrap().contains(&q.id));
    }
}
