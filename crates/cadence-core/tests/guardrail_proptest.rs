//! Property tests for guardrail and scheduling invariants

use cadence_core::calendar::{PlannedComment, PlannedPost};
use cadence_core::guardrails::{GuardrailRule, Guardrails};
use cadence_core::history::PersonaActivity;
use cadence_core::model::Persona;
use cadence_core::rng::PlannerRng;
use cadence_core::schedule::Scheduler;
use cadence_core::types::{day_start, PostType, Timestamp};
use chrono::{Datelike, Duration, NaiveDate};
use proptest::prelude::*;

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
}

fn post_at(at: Timestamp) -> PlannedPost {
    let mut first = PlannedComment::new("p2", 45, at);
    first.seed_text = "How did you measure this?".to_string();

    PlannedPost {
        id: format!("post_{}", at.timestamp()),
        day: at.weekday(),
        subreddit: "r/saas".to_string(),
        author_id: "p1".to_string(),
        title: "title".to_string(),
        body_preview: "preview".to_string(),
        body: None,
        post_type: PostType::Question,
        theme_ids: vec!["t1".to_string()],
        comments: vec![first],
        quality_score: 7.0,
        quality_factors: vec![],
        scheduled_at: at,
    }
}

proptest! {
    /// The 48h gap check passes exactly when the recorded post is at least
    /// 48 hours before the start of the candidate day.
    #[test]
    fn prop_min_gap_boundary(gap_hours in 0i64..200) {
        let date = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        let week_start = NaiveDate::from_ymd_opt(2025, 3, 17).unwrap();
        let persona = Persona::new("p1", "u/one").with_weekly_quota(7);

        let posted_at = day_start(date) - Duration::hours(gap_hours);
        let mut activity = PersonaActivity::new("p1");
        activity.post_dates.push(posted_at);
        activity.last_post = Some(posted_at);

        let check = Guardrails::can_persona_post_on_date(
            &persona,
            Some(&activity),
            date,
            week_start,
        );
        let gap_violation = check
            .violations
            .iter()
            .any(|v| v.rule == GuardrailRule::Min48hGap);

        prop_assert_eq!(gap_violation, gap_hours < 48);
    }

    /// Spreading always yields at least 24h between adjacent posts and never
    /// moves a post earlier.
    #[test]
    fn prop_spread_enforces_gap(
        offsets in proptest::collection::vec(0i64..7 * 24 * 60, 1..6),
        seed in 0u64..1000,
    ) {
        let base = day_start(monday());
        let mut posts: Vec<PlannedPost> = offsets
            .iter()
            .map(|minutes| post_at(base + Duration::minutes(*minutes)))
            .collect();
        let earliest = posts.iter().map(|p| p.scheduled_at).min().unwrap();

        let mut rng = PlannerRng::seeded(seed);
        Scheduler::spread_posts(&mut posts, &mut rng);

        for pair in posts.windows(2) {
            prop_assert!(pair[1].scheduled_at - pair[0].scheduled_at >= Duration::hours(24));
        }
        // The first post anchors the spread; nothing moves before it
        prop_assert_eq!(posts[0].scheduled_at, earliest);

        // Comment absolute times follow their post
        for post in &posts {
            for comment in &post.comments {
                prop_assert_eq!(
                    comment.scheduled_at,
                    post.scheduled_at + Duration::minutes(comment.delay_minutes)
                );
            }
        }
    }

    /// Spreading an already-compliant list is a no-op
    #[test]
    fn prop_spread_idempotent(seed in 0u64..1000) {
        let base = day_start(monday()) + Duration::hours(9);
        let mut posts = vec![
            post_at(base),
            post_at(base + Duration::hours(7)),
            post_at(base + Duration::hours(11)),
        ];

        let mut rng = PlannerRng::seeded(seed);
        Scheduler::spread_posts(&mut posts, &mut rng);
        let once: Vec<Timestamp> = posts.iter().map(|p| p.scheduled_at).collect();

        Scheduler::spread_posts(&mut posts, &mut rng);
        let twice: Vec<Timestamp> = posts.iter().map(|p| p.scheduled_at).collect();

        prop_assert_eq!(once, twice);
    }

    /// Generated posting times always land on the requested calendar day
    #[test]
    fn prop_schedule_time_stays_on_day(day_offset in 0i64..7, seed in 0u64..1000) {
        let day = monday() + Duration::days(day_offset);
        let mut rng = PlannerRng::seeded(seed);

        let at = Scheduler::schedule_time(day, &mut rng);
        prop_assert_eq!(at.date_naive(), day);
    }
}
