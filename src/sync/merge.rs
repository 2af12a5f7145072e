//! Local-wins merge with read-repair
//!
//! Pure function over in-memory data; no network or storage dependency.
//! The reconciler applies the returned repairs to the local cache before
//! returning the merged list, so a subsequent reload is local-only.

use std::collections::{HashMap, HashSet};

use crate::model::{creation_order, Question};

/// Everything the merge needs, gathered by the caller
#[derive(Debug, Default)]
pub struct MergeInput {
    /// Custom questions from whichever side answered (remote when
    /// reachable, local cache otherwise)
    pub custom: Vec<Question>,

    /// Local answer cache, keyed by question id
    pub local_answers: HashMap<String, String>,

    /// Remote answer collection, keyed by question id; empty when offline
    pub remote_answers: HashMap<String, String>,

    /// Question ids deleted locally; never resurrected from remote data
    pub tombstones: HashSet<String>,
}

/// A remote answer that was missing locally and must be written into the
/// local cache
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repair {
    pub question_id: String,
    pub answer: String,
}

/// Merge result: the authoritative question list plus the cache writes
/// required to make future loads local-only
#[derive(Debug)]
pub struct Merged {
    pub questions: Vec<Question>,
    pub repairs: Vec<Repair>,
}

/// Merge custom questions with the static catalog and attach answers.
///
/// Custom questions come first, newest creation id first, then the catalog
/// in its fixed order. For each question the local answer wins; a remote
/// answer fills a missing local one and is emitted as a repair.
#[must_use]
pub fn merge(catalog: &[Question], input: MergeInput) -> Merged {
    let MergeInput {
        mut custom,
        local_answers,
        remote_answers,
        tombstones,
    } = input;

    custom.retain(|q| !tombstones.contains(&q.id));
    custom.sort_by_key(|q| std::cmp::Reverse(creation_order(&q.id)));

    let mut repairs = Vec::new();
    let questions = custom
        .into_iter()
        .chain(catalog.iter().cloned())
        .map(|mut q| {
            if let Some(local) = local_answers.get(&q.id) {
                q.cached_answer = Some(local.clone());
            } else if let Some(remote) = remote_answers.get(&q.id) {
                q.cached_answer = Some(remote.clone());
                repairs.push(Repair {
                    question_id: q.id.clone(),
                    answer: remote.clone(),
                });
            }
            q
        })
        .collect();

    Merged { questions, repairs }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom_q(id: &str, text: &str) -> Question {
        Question {
            id: id.to_string(),
            text: text.to_string(),
            category: Some("Custom".to_string()),
            cached_answer: None,
            is_custom: true,
        }
    }

    fn catalog() -> Vec<Question> {
        vec![
            Question::catalog("1", "What is a service?", "Architecture"),
            Question::catalog("g3", "What is a closure?", "JavaScript"),
        ]
    }

    #[test]
    fn custom_sorted_newest_first_before_catalog() {
        let input = MergeInput {
            custom: vec![custom_q("100", "old"), custom_q("300", "new"), custom_q("200", "mid")],
            ..MergeInput::default()
        };

        let merged = merge(&catalog(), input);
        let ids: Vec<&str> = merged.questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, ["300", "200", "100", "1", "g3"]);
    }

    #[test]
    fn local_answer_wins_over_remote() {
        let input = MergeInput {
            local_answers: HashMap::from([("1".to_string(), "local".to_string())]),
            remote_answers: HashMap::from([("1".to_string(), "remote".to_string())]),
            ..MergeInput::default()
        };

        let merged = merge(&catalog(), input);
        let q1 = merged.questions.iter().find(|q| q.id == "1").unwrap();
        assert_eq!(q1.cached_answer.as_deref(), Some("local"));
        assert!(merged.repairs.is_empty());
    }

    #[test]
    fn remote_answer_fills_gap_and_emits_repair() {
        let input = MergeInput {
            remote_answers: HashMap::from([("g3".to_string(), "lexical scope".to_string())]),
            ..MergeInput::default()
        };

        let merged = merge(&catalog(), input);
        let g3 = merged.questions.iter().find(|q| q.id == "g3").unwrap();
        assert_eq!(g3.cached_answer.as_deref(), Some("lexical scope"));
        assert_eq!(
            merged.repairs,
            vec![Repair {
                question_id: "g3".to_string(),
                answer: "lexical scope".to_string(),
            }]
        );
    }

    #[test]
    fn tombstoned_questions_never_resurface() {
        let input = MergeInput {
            custom: vec![custom_q("100", "kept"), custom_q("200", "deleted")],
            remote_answers: HashMap::from([("200".to_string(), "stale".to_string())]),
            tombstones: HashSet::from(["200".to_string()]),
            ..MergeInput::default()
        };

        let merged = merge(&catalog(), input);
        assert!(merged.questions.iter().all(|q| q.id != "200"));
        assert!(merged.repairs.is_empty());
    }

    #[test]
    fn unanswered_questions_stay_unanswered() {
        let merged = merge(&catalog(), MergeInput::default());
        assert!(merged.questions.iter().all(|q| q.cached_answer.is_none()));
    }
}
