//! Persona assignment
//!
//! Picks the author and 1-2 commenters for a slot and builds the comment
//! skeleton. The "natural conversation" contract is enforced by generation
//! order: the author is never the first commenter and no comment shares an
//! author with its parent, by construction rather than post-hoc filtering.

use chrono::NaiveDate;
use std::collections::HashSet;

use crate::calendar::PlannedComment;
use crate::capacity::WeekCapacity;
use crate::model::{Persona, PlannerInput, Subreddit, Theme};
use crate::rng::PlannerRng;
use crate::types::{day_start, PostType};

/// Author and comment skeleton for one slot.
///
/// Comment timestamps are provisional (midnight of the target day) until the
/// scheduler fixes the post time; delay minutes are the source of truth.
#[derive(Debug, Clone)]
pub struct Assignment {
    pub author_id: String,
    pub commenter_ids: Vec<String>,
    pub comments: Vec<PlannedComment>,
}

/// Picks authors and commenters per slot
#[derive(Debug)]
pub struct PersonaAssigner;

impl PersonaAssigner {
    /// Assign an author and commenters for the slot, or None if no persona
    /// is eligible. A None must be skipped by the orchestrator, never retried
    /// with relaxed rules.
    pub fn assign(
        input: &PlannerInput,
        capacity: &WeekCapacity,
        day: NaiveDate,
        theme: &Theme,
        subreddit: &Subreddit,
        post_type: PostType,
        used_authors: &HashSet<String>,
        rng: &mut PlannerRng,
    ) -> Option<Assignment> {
        let mut eligible: Vec<(&Persona, f64)> = input
            .personas
            .iter()
            .filter(|persona| Self::is_eligible_author(persona, capacity, day, used_authors))
            .map(|persona| {
                (
                    persona,
                    Self::affinity(persona, theme, subreddit, post_type),
                )
            })
            .collect();

        if eligible.is_empty() {
            return None;
        }

        eligible.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.id.cmp(&b.0.id))
        });
        let author = eligible[0].0;

        let mut others: Vec<(&Persona, f64)> = input
            .personas
            .iter()
            .filter(|p| p.id != author.id)
            .map(|p| (p, Self::affinity(p, theme, subreddit, post_type)))
            .collect();
        others.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.id.cmp(&b.0.id))
        });

        let commenters: Vec<&Persona> =
            others.iter().take(2).map(|(p, _)| *p).collect();
        if commenters.is_empty() {
            return None;
        }

        let comments = Self::build_thread(author, &commenters, day, rng);

        Some(Assignment {
            author_id: author.id.clone(),
            commenter_ids: commenters.iter().map(|p| p.id.clone()).collect(),
            comments,
        })
    }

    fn is_eligible_author(
        persona: &Persona,
        capacity: &WeekCapacity,
        day: NaiveDate,
        used_authors: &HashSet<String>,
    ) -> bool {
        if used_authors.contains(&persona.id) {
            return false;
        }
        let Some(availability) = capacity.persona(&persona.id) else {
            return false;
        };
        if availability.remaining_quota == 0 {
            return false;
        }
        if !availability.available_days.contains(&day) {
            return false;
        }
        match availability.blocked_until {
            Some(blocked_until) => blocked_until <= day_start(day),
            None => true,
        }
    }

    /// Keyword/role affinity between a persona and the slot's topic
    fn affinity(
        persona: &Persona,
        theme: &Theme,
        subreddit: &Subreddit,
        post_type: PostType,
    ) -> f64 {
        let mut score = 1.0;

        let background = persona.background.to_lowercase();
        let keyword = theme.keyword.to_lowercase();

        for token in keyword.split_whitespace() {
            if token.len() > 3 && background.contains(token) {
                score += 2.0;
            }
        }

        if let Some(role) = &persona.role {
            let role = role.to_lowercase();
            if keyword.contains(&role) || background.contains(&keyword) {
                score += 1.5;
            }
            if matches!(post_type, PostType::Education | PostType::CaseStudy) {
                score += 0.5;
            }
        }

        if let Some(notes) = &subreddit.culture_notes {
            let notes = notes.to_lowercase();
            for token in background.split_whitespace() {
                if token.len() > 4 && notes.contains(token) {
                    score += 0.5;
                    break;
                }
            }
        }

        if matches!(post_type, PostType::Story)
            && (background.contains("founder") || background.contains("built"))
        {
            score += 1.0;
        }

        score
    }

    /// Build the comment skeleton:
    /// 1. first commenter at 30-90 min, never a reply;
    /// 2. optional second commenter at +15-45 min, 70% a reply to the first;
    /// 3. 50% author acknowledgment of the first comment at +10-30 min.
    fn build_thread(
        author: &Persona,
        commenters: &[&Persona],
        day: NaiveDate,
        rng: &mut PlannerRng,
    ) -> Vec<PlannedComment> {
        let post_time = day_start(day);
        let mut comments = Vec::new();

        let first_delay = rng.minutes_between(30, 90);
        let first = PlannedComment::new(&commenters[0].id, first_delay, post_time);
        let mut last_delay = first_delay;
        comments.push(first);

        if let Some(second_commenter) = commenters.get(1) {
            let delay = last_delay + rng.minutes_between(15, 45);
            let mut second = PlannedComment::new(&second_commenter.id, delay, post_time);
            if rng.chance(0.7) {
                second = second.reply_to(&comments[0]);
            }
            last_delay = delay;
            comments.push(second);
        }

        if rng.chance(0.5) {
            let delay = last_delay + rng.minutes_between(10, 30);
            let ack = PlannedComment::new(&author.id, delay, post_time).reply_to(&comments[0]);
            comments.push(ack);
        }

        comments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capacity::CapacityCalculator;
    use crate::history::PlannerHistory;
    use crate::model::{Company, Subreddit, Theme};

    fn input() -> PlannerInput {
        PlannerInput {
            company: Company::new("Slideforge", "Deck automation"),
            personas: vec![
                Persona::new("p1", "u/maker_one")
                    .with_background("founder who built two saas products")
                    .with_weekly_quota(2),
                Persona::new("p2", "u/maker_two")
                    .with_background("growth marketer into churn metrics")
                    .with_weekly_quota(2),
                Persona::new("p3", "u/maker_three")
                    .with_background("backend engineer, pricing nerd")
                    .with_weekly_quota(2),
            ],
            subreddits: vec![Subreddit::new("r/saas")],
            themes: vec![Theme::new("t1", "churn metrics")],
            posts_per_week: 3,
        }
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    fn capacity(input: &PlannerInput) -> WeekCapacity {
        CapacityCalculator::compute(input, &PlannerHistory::new(), monday())
    }

    fn assign(
        input: &PlannerInput,
        used: &HashSet<String>,
        seed: u64,
    ) -> Option<Assignment> {
        let capacity = capacity(input);
        let theme = &input.themes[0];
        let subreddit = &input.subreddits[0];
        let mut rng = PlannerRng::seeded(seed);
        PersonaAssigner::assign(
            input,
            &capacity,
            monday(),
            theme,
            subreddit,
            PostType::Question,
            used,
            &mut rng,
        )
    }

    #[test]
    fn test_best_affinity_wins_author() {
        let input = input();
        let assignment = assign(&input, &HashSet::new(), 1).unwrap();

        // "churn metrics" lives in p2's background
        assert_eq!(assignment.author_id, "p2");
        assert!(!assignment.commenter_ids.contains(&"p2".to_string()));
        assert_eq!(assignment.commenter_ids.len(), 2);
    }

    #[test]
    fn test_author_is_never_first_commenter() {
        let input = input();
        for seed in 0..64 {
            let assignment = assign(&input, &HashSet::new(), seed).unwrap();
            assert_ne!(assignment.comments[0].author_id, assignment.author_id);
        }
    }

    #[test]
    fn test_no_comment_replies_to_its_own_author() {
        let input = input();
        for seed in 0..64 {
            let assignment = assign(&input, &HashSet::new(), seed).unwrap();
            for comment in &assignment.comments {
                if let Some(parent_id) = &comment.parent_id {
                    let parent_author = assignment
                        .comments
                        .iter()
                        .find(|c| &c.id == parent_id)
                        .map(|c| c.author_id.as_str())
                        .unwrap();
                    assert_ne!(parent_author, comment.author_id);
                }
            }
        }
    }

    #[test]
    fn test_delays_are_ordered_and_bounded() {
        let input = input();
        for seed in 0..64 {
            let assignment = assign(&input, &HashSet::new(), seed).unwrap();

            let first = &assignment.comments[0];
            assert!((30..=90).contains(&first.delay_minutes));
            assert!(first.parent_id.is_none());

            let mut prev = first.delay_minutes;
            for comment in assignment.comments.iter().skip(1) {
                assert!(comment.delay_minutes > prev);
                prev = comment.delay_minutes;
            }
        }
    }

    #[test]
    fn test_used_author_is_skipped() {
        let input = input();
        let mut used = HashSet::new();
        used.insert("p2".to_string());

        let assignment = assign(&input, &used, 1).unwrap();
        assert_ne!(assignment.author_id, "p2");
    }

    #[test]
    fn test_all_used_yields_none() {
        let input = input();
        let used: HashSet<String> =
            input.personas.iter().map(|p| p.id.clone()).collect();

        assert!(assign(&input, &used, 1).is_none());
    }

    #[test]
    fn test_blocked_until_excludes_author() {
        let input = input();
        let mut capacity = capacity(&input);
        // p2 is blocked past the target day
        for availability in &mut capacity.personas {
            if availability.persona_id == "p2" {
                availability.blocked_until =
                    Some(day_start(monday()) + chrono::Duration::hours(12));
            }
        }

        let mut rng = PlannerRng::seeded(1);
        let assignment = PersonaAssigner::assign(
            &input,
            &capacity,
            monday(),
            &input.themes[0],
            &input.subreddits[0],
            PostType::Question,
            &HashSet::new(),
            &mut rng,
        )
        .unwrap();

        assert_ne!(assignment.author_id, "p2");
    }
}
