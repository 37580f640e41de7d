//! Assignment policy
//!
//! Pure decisions about which reviewers a PR gets. Callers load the PR and
//! the candidate pool from the Directory, ask the policy, and write the
//! answer back. Every decision re-checks the invariants against the pool it
//! is given: inactive users, the author and current reviewers never come
//! out of it.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::lifecycle;
use crate::model::{PullRequest, User};
use crate::selector::ReviewerSelector;

/// Default cap on simultaneous reviewers per PR
pub const DEFAULT_MAX_REVIEWERS: usize = 2;

/// Result of topping up a PR's reviewers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopUp {
    /// Already at the cap, nothing to do
    Full,
    /// Below the cap but nobody is eligible
    NoCandidates,
    /// Reviewers to add, never more than the free slots
    Add(Vec<String>),
}

/// Reviewer selection rules with their random source
#[derive(Debug)]
pub struct AssignmentPolicy {
    max_reviewers: usize,
    selector: ReviewerSelector,
}

impl AssignmentPolicy {
    pub fn new(max_reviewers: usize, selector: ReviewerSelector) -> Self {
        Self {
            max_reviewers,
            selector,
        }
    }

    pub fn max_reviewers(&self) -> usize {
        self.max_reviewers
    }

    /// Reviewers for a new PR by `author`
    ///
    /// `teammates` is the author's active team without the author. Returns up
    /// to the cap; an empty or short pool is not an error.
    pub fn initial_reviewers(&self, author: &User, teammates: &[User]) -> Vec<String> {
        let pool = eligible(teammates, &HashSet::from([author.id.as_str()]));
        self.pick_ids(&pool, self.max_reviewers)
    }

    /// Fill the free reviewer slots of `pr` from `pool`
    pub fn top_up(&self, pr: &PullRequest, pool: &[User]) -> Result<TopUp> {
        lifecycle::ensure_mutable(pr)?;

        if pr.reviewers.len() >= self.max_reviewers {
            return Ok(TopUp::Full);
        }
        let need = self.max_reviewers - pr.reviewers.len();

        let pool = eligible(pool, &occupied(pr));
        if pool.is_empty() {
            return Ok(TopUp::NoCandidates);
        }

        Ok(TopUp::Add(self.pick_ids(&pool, need)))
    }

    /// Choose a successor for `old_id` on `pr`
    ///
    /// `pool` is the active team of the outgoing reviewer. The author and
    /// every current reviewer are excluded.
    pub fn replace_one(&self, pr: &PullRequest, old_id: &str, pool: &[User]) -> Result<String> {
        check_replaceable(pr, old_id)?;

        let pool = eligible(pool, &occupied(pr));
        self.pick_ids(&pool, 1)
            .pop()
            .ok_or_else(|| Error::NoCandidate {
                pr_id: pr.id.clone(),
            })
    }

    fn pick_ids(&self, pool: &[&User], count: usize) -> Vec<String> {
        self.selector
            .pick(pool, count)
            .into_iter()
            .map(|u| u.id.clone())
            .collect()
    }
}

/// Fails unless `old_id` can be replaced on `pr`
///
/// A merged PR is reported before a missing reviewer.
pub fn check_replaceable(pr: &PullRequest, old_id: &str) -> Result<()> {
    lifecycle::ensure_mutable(pr)?;

    if !pr.has_reviewer(old_id) {
        return Err(Error::NotAssigned {
            pr_id: pr.id.clone(),
            user_id: old_id.to_string(),
        });
    }
    Ok(())
}

/// Author plus every current reviewer
fn occupied(pr: &PullRequest) -> HashSet<&str> {
    std::iter::once(pr.author_id.as_str())
        .chain(pr.reviewers.iter().map(String::as_str))
        .collect()
}

/// Active users of `pool` not in `exclude`, each id once
fn eligible<'a>(pool: &'a [User], exclude: &HashSet<&str>) -> Vec<&'a User> {
    let mut seen = HashSet::new();
    pool.iter()
        .filter(|u| u.is_active && !exclude.contains(u.id.as_str()))
        .filter(|u| seen.insert(u.id.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::PrStatus;

    fn policy() -> AssignmentPolicy {
        AssignmentPolicy::new(DEFAULT_MAX_REVIEWERS, ReviewerSelector::seeded(11))
    }

    fn user(id: &str) -> User {
        User::new(id, id.to_uppercase(), "backend")
    }

    fn users(ids: &[&str]) -> Vec<User> {
        ids.iter().map(|id| user(id)).collect()
    }

    fn pr(author: &str, reviewers: &[&str]) -> PullRequest {
        PullRequest::open(
            "pr-1",
            "Add search",
            author,
            reviewers.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_initial_reviewers_never_include_author() {
        let policy = policy();
        let author = user("a");
        for _ in 0..50 {
            let picked = policy.initial_reviewers(&author, &users(&["a", "b", "c", "d"]));
            assert_eq!(picked.len(), 2);
            assert!(!picked.contains(&"a".to_string()));
            assert_ne!(picked[0], picked[1]);
        }
    }

    #[test]
    fn test_initial_reviewers_small_team() {
        let policy = policy();
        let author = user("a");
        assert_eq!(policy.initial_reviewers(&author, &users(&["b"])), vec!["b"]);
        assert!(policy.initial_reviewers(&author, &[]).is_empty());
    }

    #[test]
    fn test_initial_reviewers_exact_pool_is_deterministic() {
        let policy = policy();
        let picked = policy.initial_reviewers(&user("a"), &users(&["b", "c"]));
        assert_eq!(picked, vec!["b", "c"]);
    }

    #[test]
    fn test_initial_reviewers_skip_inactive() {
        let policy = policy();
        let pool = vec![user("b").inactive(), user("c")];
        assert_eq!(policy.initial_reviewers(&user("a"), &pool), vec!["c"]);
    }

    #[test]
    fn test_top_up_full_is_noop() {
        let policy = policy();
        let outcome = policy.top_up(&pr("a", &["b", "c"]), &users(&["d", "e"])).unwrap();
        assert_eq!(outcome, TopUp::Full);
    }

    #[test]
    fn test_top_up_fills_free_slots() {
        let policy = policy();
        let outcome = policy.top_up(&pr("a", &["b"]), &users(&["b", "c"])).unwrap();
        assert_eq!(outcome, TopUp::Add(vec!["c".to_string()]));

        let outcome = policy.top_up(&pr("a", &[]), &users(&["b", "c", "d"])).unwrap();
        match outcome {
            TopUp::Add(ids) => assert_eq!(ids.len(), 2),
            other => panic!("expected additions, got {:?}", other),
        }
    }

    #[test]
    fn test_top_up_empty_pool() {
        let policy = policy();
        let outcome = policy.top_up(&pr("a", &["b"]), &users(&["a", "b"])).unwrap();
        assert_eq!(outcome, TopUp::NoCandidates);
    }

    #[test]
    fn test_top_up_merged_fails() {
        let policy = policy();
        let mut merged = pr("a", &[]);
        merged.status = PrStatus::Merged;
        let err = policy.top_up(&merged, &users(&["b"])).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn test_replace_one_picks_only_eligible() {
        let policy = policy();
        let new_id = policy
            .replace_one(&pr("a", &["b", "c"]), "b", &users(&["a", "b", "c", "d"]))
            .unwrap();
        assert_eq!(new_id, "d");
    }

    #[test]
    fn test_replace_one_merged_wins_over_other_checks() {
        let policy = policy();
        let mut merged = pr("a", &["b"]);
        merged.status = PrStatus::Merged;

        let err = policy.replace_one(&merged, "not-a-reviewer", &[]).unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[test]
    fn test_replace_one_not_assigned() {
        let policy = policy();
        let err = policy
            .replace_one(&pr("a", &["b"]), "z", &users(&["c"]))
            .unwrap_err();
        assert!(matches!(err, Error::NotAssigned { .. }));
    }

    #[test]
    fn test_replace_one_no_candidate() {
        let policy = policy();
        let err = policy
            .replace_one(&pr("a", &["b", "c"]), "b", &users(&["a", "b", "c"]))
            .unwrap_err();
        assert!(matches!(err, Error::NoCandidate { .. }));
    }
}
