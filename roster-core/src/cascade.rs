//! Cascade planning for reviewers who go inactive
//!
//! When users are deactivated, every open PR they review needs its reviewer
//! slots repaired. The planner computes the whole repair up front: for each
//! vacated slot it picks the first eligible teammate in user id order, or
//! records the slot as removed when nobody is left.
//!
//! Eligibility on a PR is tracked with an explicit occupied set, seeded with
//! the author and the surviving reviewers and grown with every replacement
//! chosen for that PR. A candidate therefore never fills two slots on the
//! same PR, and never lands on a PR they author or already review.

use std::collections::{BTreeMap, HashSet};

use crate::model::{PullRequest, User};

/// Planned reviewer changes, keyed by PR id then by the outgoing reviewer
///
/// `None` as the new reviewer means the slot is vacated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReassignmentPlan {
    changes: BTreeMap<String, BTreeMap<String, Option<String>>>,
}

impl ReassignmentPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `old_id` leaves `pr_id`, replaced by `new_id` if any
    pub fn record(
        &mut self,
        pr_id: impl Into<String>,
        old_id: impl Into<String>,
        new_id: Option<String>,
    ) {
        self.changes
            .entry(pr_id.into())
            .or_default()
            .insert(old_id.into(), new_id);
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of reviewer slots touched, replaced or vacated
    pub fn slot_count(&self) -> usize {
        self.changes.values().map(BTreeMap::len).sum()
    }

    /// Number of slots that get a new reviewer
    pub fn replacement_count(&self) -> usize {
        self.iter().filter(|(_, _, new)| new.is_some()).count()
    }

    /// Number of slots left empty
    pub fn vacancy_count(&self) -> usize {
        self.slot_count() - self.replacement_count()
    }

    /// PR ids touched by the plan, in id order
    pub fn pr_ids(&self) -> impl Iterator<Item = &str> {
        self.changes.keys().map(String::as_str)
    }

    /// Changes planned for one PR
    pub fn for_pr(&self, pr_id: &str) -> Option<&BTreeMap<String, Option<String>>> {
        self.changes.get(pr_id)
    }

    /// Every `(pr_id, old_id, new_id)` triple
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, Option<&str>)> {
        self.changes.iter().flat_map(|(pr_id, slots)| {
            slots
                .iter()
                .map(move |(old, new)| (pr_id.as_str(), old.as_str(), new.as_deref()))
        })
    }

    /// Fold another plan into this one
    pub fn merge(&mut self, other: ReassignmentPlan) {
        for (pr_id, slots) in other.changes {
            self.changes.entry(pr_id).or_default().extend(slots);
        }
    }
}

/// Computes reviewer repairs from a fixed pool of replacement candidates
#[derive(Debug, Clone)]
pub struct CascadePlanner {
    candidates: Vec<User>,
}

impl CascadePlanner {
    /// Planner for a team losing the `leaving` users
    ///
    /// Candidates are the members who are active and not leaving.
    pub fn for_team(members: &[User], leaving: &HashSet<String>) -> Self {
        Self::from_candidates(
            members
                .iter()
                .filter(|u| !leaving.contains(&u.id))
                .cloned()
                .collect(),
        )
    }

    /// Planner over an explicit pool; inactive users are dropped
    pub fn from_candidates(candidates: Vec<User>) -> Self {
        let mut candidates: Vec<User> = candidates.into_iter().filter(|u| u.is_active).collect();
        candidates.sort_by(|a, b| a.id.cmp(&b.id));
        candidates.dedup_by(|a, b| a.id == b.id);
        Self { candidates }
    }

    /// Candidates in scan order
    pub fn candidates(&self) -> &[User] {
        &self.candidates
    }

    /// Plan the slots of `leaving` reviewers on one PR
    ///
    /// Merged PRs are frozen and yield no changes.
    pub fn plan_pr(
        &self,
        pr: &PullRequest,
        leaving: &HashSet<String>,
    ) -> Vec<(String, Option<String>)> {
        if !pr.status.allows_reviewer_changes() {
            return Vec::new();
        }

        let mut occupied: HashSet<&str> = HashSet::with_capacity(pr.reviewers.len() + 1);
        occupied.insert(pr.author_id.as_str());
        for reviewer in &pr.reviewers {
            if !leaving.contains(reviewer) {
                occupied.insert(reviewer.as_str());
            }
        }

        let mut slots = Vec::new();
        for reviewer in pr.reviewers.iter().filter(|r| leaving.contains(*r)) {
            let replacement = self
                .candidates
                .iter()
                .find(|c| !occupied.contains(c.id.as_str()))
                .map(|c| c.id.as_str());

            if let Some(new_id) = replacement {
                occupied.insert(new_id);
            }
            slots.push((reviewer.clone(), replacement.map(str::to_string)));
        }
        slots
    }

    /// Plan every PR in `prs`
    pub fn plan(&self, prs: &[PullRequest], leaving: &HashSet<String>) -> ReassignmentPlan {
        let mut plan = ReassignmentPlan::new();
        for pr in prs {
            for (old_id, new_id) in self.plan_pr(pr, leaving) {
                match &new_id {
                    Some(new_id) => tracing::debug!(pr_id = %pr.id, old = %old_id, new = %new_id, "Planned reviewer replacement"),
                    None => tracing::debug!(pr_id = %pr.id, old = %old_id, "Planned reviewer removal, no candidate"),
                }
                plan.record(pr.id.clone(), old_id, new_id);
            }
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::PrStatus;

    fn team(ids: &[&str]) -> Vec<User> {
        ids.iter()
            .map(|id| User::new(*id, id.to_uppercase(), "backend"))
            .collect()
    }

    fn leaving(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn pr(id: &str, author: &str, reviewers: &[&str]) -> PullRequest {
        PullRequest::open(
            id,
            format!("Feature {}", id),
            author,
            reviewers.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_plan_replaces_in_id_order() {
        let members = team(&["u1", "u2", "u3", "u4", "u5"]);
        let out = leaving(&["u2", "u3"]);
        let planner = CascadePlanner::for_team(&members, &out);

        let prs = vec![pr("pr-1", "u1", &["u2", "u3"]), pr("pr-2", "u4", &["u2"])];
        let plan = planner.plan(&prs, &out);

        let pr1 = plan.for_pr("pr-1").unwrap();
        assert_eq!(pr1.get("u2"), Some(&Some("u4".to_string())));
        assert_eq!(pr1.get("u3"), Some(&Some("u5".to_string())));

        let pr2 = plan.for_pr("pr-2").unwrap();
        assert_eq!(pr2.get("u2"), Some(&Some("u1".to_string())));

        assert_eq!(plan.slot_count(), 3);
        assert_eq!(plan.replacement_count(), 3);
        assert_eq!(plan.vacancy_count(), 0);
    }

    #[test]
    fn test_no_double_booking_on_one_pr() {
        let members = team(&["a", "b", "c", "d", "e"]);
        let out = leaving(&["b", "c"]);
        let planner = CascadePlanner::for_team(&members, &out);

        let slots = planner.plan_pr(&pr("pr-1", "a", &["b", "c"]), &out);
        let new_ids: Vec<_> = slots.iter().filter_map(|(_, n)| n.clone()).collect();
        assert_eq!(new_ids, vec!["d".to_string(), "e".to_string()]);
    }

    #[test]
    fn test_vacates_when_pool_exhausted() {
        let members = team(&["u2", "u3"]);
        let out = leaving(&["u2", "u3"]);
        let planner = CascadePlanner::for_team(&members, &out);

        let plan = planner.plan(&[pr("pr-1", "u1", &["u2", "u3"])], &out);
        assert_eq!(plan.slot_count(), 2);
        assert_eq!(plan.vacancy_count(), 2);
        assert!(plan.iter().all(|(_, _, new)| new.is_none()));
    }

    #[test]
    fn test_partial_pool_fills_first_slot_only() {
        let members = team(&["a", "b", "c", "d"]);
        let out = leaving(&["b", "c"]);
        let planner = CascadePlanner::for_team(&members, &out);

        let slots = planner.plan_pr(&pr("pr-1", "a", &["b", "c"]), &out);
        assert_eq!(
            slots,
            vec![
                ("b".to_string(), Some("d".to_string())),
                ("c".to_string(), None),
            ]
        );
    }

    #[test]
    fn test_surviving_reviewer_and_author_never_chosen() {
        let members = team(&["a", "b", "c"]);
        let out = leaving(&["b"]);
        let planner = CascadePlanner::for_team(&members, &out);

        // a authors, c stays: nobody is left for b's slot.
        let slots = planner.plan_pr(&pr("pr-1", "a", &["b", "c"]), &out);
        assert_eq!(slots, vec![("b".to_string(), None)]);
    }

    #[test]
    fn test_inactive_members_are_not_candidates() {
        let mut members = team(&["a", "b", "c"]);
        members[2].is_active = false;
        let out = leaving(&["b"]);
        let planner = CascadePlanner::for_team(&members, &out);

        assert_eq!(planner.candidates().len(), 1);
        let slots = planner.plan_pr(&pr("pr-1", "x", &["b"]), &out);
        assert_eq!(slots, vec![("b".to_string(), Some("a".to_string()))]);
    }

    #[test]
    fn test_merged_pr_is_left_alone() {
        let members = team(&["a", "b", "c"]);
        let out = leaving(&["b"]);
        let planner = CascadePlanner::for_team(&members, &out);

        let mut merged = pr("pr-1", "a", &["b"]);
        merged.status = PrStatus::Merged;
        assert!(planner.plan(&[merged], &out).is_empty());
    }

    #[test]
    fn test_plan_iter_and_merge() {
        let mut plan = ReassignmentPlan::new();
        plan.record("pr-1", "u2", Some("u4".into()));

        let mut other = ReassignmentPlan::new();
        other.record("pr-1", "u3", None);
        other.record("pr-2", "u2", Some("u1".into()));
        plan.merge(other);

        let triples: Vec<_> = plan.iter().collect();
        assert_eq!(
            triples,
            vec![
                ("pr-1", "u2", Some("u4")),
                ("pr-1", "u3", None),
                ("pr-2", "u2", Some("u1")),
            ]
        );
        assert_eq!(plan.pr_ids().collect::<Vec<_>>(), vec!["pr-1", "pr-2"]);
    }
}
