//! Temporal scheduling
//!
//! Picks posting days by engagement weight, generates windowed posting times
//! with jitter, and spreads the finished set so no two posts land within 24
//! hours of each other. Content never influences timing.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::calendar::PlannedPost;
use crate::rng::PlannerRng;
use crate::types::{day_start, Timestamp};

/// Minimum gap between any two posts in a week
pub const MIN_HOURS_BETWEEN_POSTS: i64 = 24;

/// Jitter applied around the windowed base time
pub const JITTER_MINUTES: i64 = 90;

/// Maximum random push added on top of the 24h gap while spreading
pub const MAX_SPREAD_PUSH_MINUTES: i64 = 12 * 60;

/// Relative engagement weight of a day of the week
pub fn day_weight(day: Weekday) -> f64 {
    match day {
        Weekday::Sun => 0.3,
        Weekday::Mon => 0.6,
        Weekday::Tue | Weekday::Wed | Weekday::Thu => 1.0,
        Weekday::Fri => 0.5,
        Weekday::Sat => 0.3,
    }
}

/// Allowed posting windows within a day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Morning,
    Midday,
    Afternoon,
    Evening,
}

impl TimeWindow {
    /// Start and end hour of the window
    pub fn hours(self) -> (u32, u32) {
        match self {
            TimeWindow::Morning => (8, 10),
            TimeWindow::Midday => (11, 13),
            TimeWindow::Afternoon => (14, 16),
            TimeWindow::Evening => (18, 20),
        }
    }
}

/// Windows allowed for a given day of the week
pub fn windows_for(day: Weekday) -> &'static [TimeWindow] {
    match day {
        Weekday::Tue | Weekday::Wed | Weekday::Thu => &[
            TimeWindow::Morning,
            TimeWindow::Midday,
            TimeWindow::Afternoon,
        ],
        Weekday::Sat | Weekday::Sun => &[TimeWindow::Afternoon, TimeWindow::Evening],
        Weekday::Mon | Weekday::Fri => &[
            TimeWindow::Morning,
            TimeWindow::Midday,
            TimeWindow::Afternoon,
            TimeWindow::Evening,
        ],
    }
}

/// Day and time selection plus minimum-gap spreading
#[derive(Debug)]
pub struct Scheduler;

impl Scheduler {
    /// Pick `count` posting days for the week: the highest-weighted days,
    /// returned in chronological order.
    pub fn select_days(week_start: NaiveDate, count: usize) -> Vec<NaiveDate> {
        let mut days: Vec<NaiveDate> = (0..7)
            .map(|offset| week_start + Duration::days(offset))
            .collect();

        // Stable sort keeps equally-weighted days chronological
        days.sort_by(|a, b| {
            day_weight(b.weekday())
                .partial_cmp(&day_weight(a.weekday()))
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut picked: Vec<NaiveDate> = days.into_iter().take(count.min(7)).collect();
        picked.sort();
        picked
    }

    /// Generate a posting time on `day`: a uniform minute inside one of the
    /// day's allowed windows, plus an independent jitter. If the jitter would
    /// cross into a different calendar date the pre-jitter time is kept.
    pub fn schedule_time(day: NaiveDate, rng: &mut PlannerRng) -> Timestamp {
        let windows = windows_for(day.weekday());
        let window = rng
            .pick(windows)
            .copied()
            .unwrap_or(TimeWindow::Afternoon);

        let (start, end) = window.hours();
        let offset = rng.minutes_between(0, ((end - start) * 60) as i64);
        let base = day_start(day) + Duration::hours(start as i64) + Duration::minutes(offset);

        let jitter = rng.minutes_between(-JITTER_MINUTES, JITTER_MINUTES);
        let candidate = base + Duration::minutes(jitter);

        if candidate.date_naive() == day {
            candidate
        } else {
            base
        }
    }

    /// Enforce the global minimum gap: sort posts by time and push any post
    /// closer than 24h to its predecessor forward to `previous + 24h + 0-12h`,
    /// recomputing its day label and comment timestamps.
    ///
    /// A list that already satisfies the gap is returned unchanged, so the
    /// pass is idempotent.
    pub fn spread_posts(posts: &mut [PlannedPost], rng: &mut PlannerRng) {
        posts.sort_by_key(|p| p.scheduled_at);

        for i in 1..posts.len() {
            let previous = posts[i - 1].scheduled_at;
            let gap = posts[i].scheduled_at - previous;
            if gap < Duration::hours(MIN_HOURS_BETWEEN_POSTS) {
                let push = rng.minutes_between(0, MAX_SPREAD_PUSH_MINUTES);
                let moved = previous
                    + Duration::hours(MIN_HOURS_BETWEEN_POSTS)
                    + Duration::minutes(push);
                posts[i].reschedule(moved);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::PlannedComment;
    use crate::types::PostType;
    use chrono::Timelike;

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()
    }

    #[test]
    fn test_select_days_prefers_midweek() {
        let days = Scheduler::select_days(monday(), 3);

        assert_eq!(
            days,
            vec![
                monday() + Duration::days(1), // Tue
                monday() + Duration::days(2), // Wed
                monday() + Duration::days(3), // Thu
            ]
        );
    }

    #[test]
    fn test_select_days_chronological_and_capped() {
        let days = Scheduler::select_days(monday(), 5);
        assert_eq!(days.len(), 5);
        assert!(days.windows(2).all(|w| w[0] < w[1]));
        // Monday and Friday join once the midweek days are taken
        assert!(days.contains(&monday()));
        assert!(days.contains(&(monday() + Duration::days(4))));

        assert_eq!(Scheduler::select_days(monday(), 10).len(), 7);
    }

    #[test]
    fn test_schedule_time_stays_on_day() {
        let mut rng = PlannerRng::seeded(3);
        for offset in 0..7 {
            let day = monday() + Duration::days(offset);
            for _ in 0..128 {
                let at = Scheduler::schedule_time(day, &mut rng);
                assert_eq!(at.date_naive(), day);
            }
        }
    }

    #[test]
    fn test_weekend_times_are_afternoon_or_evening() {
        let mut rng = PlannerRng::seeded(5);
        let saturday = monday() + Duration::days(5);

        for _ in 0..128 {
            let at = Scheduler::schedule_time(saturday, &mut rng);
            // Earliest: 14:00 - 90min jitter; latest: 20:00 + 90min
            let minutes = (at.hour() * 60 + at.minute()) as i64;
            assert!(minutes >= 14 * 60 - JITTER_MINUTES);
            assert!(minutes <= 20 * 60 + JITTER_MINUTES);
        }
    }

    #[test]
    fn test_midweek_has_no_evening_window() {
        let mut rng = PlannerRng::seeded(7);
        let tuesday = monday() + Duration::days(1);

        for _ in 0..128 {
            let at = Scheduler::schedule_time(tuesday, &mut rng);
            let minutes = (at.hour() * 60 + at.minute()) as i64;
            assert!(minutes <= 16 * 60 + JITTER_MINUTES);
        }
    }

    fn post_at(at: Timestamp) -> PlannedPost {
        let mut first = PlannedComment::new("p2", 45, at);
        first.seed_text = "How did you measure this?".to_string();

        PlannedPost {
            id: crate::types::prefixed_id("post"),
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

    #[test]
    fn test_spread_enforces_minimum_gap() {
        let base = day_start(monday()) + Duration::hours(9);
        let mut posts = vec![
            post_at(base),
            post_at(base + Duration::hours(3)),
            post_at(base + Duration::hours(5)),
        ];

        let mut rng = PlannerRng::seeded(11);
        Scheduler::spread_posts(&mut posts, &mut rng);

        for pair in posts.windows(2) {
            let gap = pair[1].scheduled_at - pair[0].scheduled_at;
            assert!(gap >= Duration::hours(MIN_HOURS_BETWEEN_POSTS));
        }

        // Day labels and comment times follow the moved posts
        for post in &posts {
            assert_eq!(post.day, post.scheduled_at.weekday());
            assert_eq!(
                post.comments[0].scheduled_at,
                post.scheduled_at + Duration::minutes(45)
            );
        }
    }

    #[test]
    fn test_spread_is_idempotent_on_compliant_input() {
        let base = day_start(monday()) + Duration::hours(9);
        let mut posts = vec![
            post_at(base),
            post_at(base + Duration::hours(26)),
            post_at(base + Duration::hours(55)),
        ];
        let before: Vec<Timestamp> = posts.iter().map(|p| p.scheduled_at).collect();

        let mut rng = PlannerRng::seeded(13);
        Scheduler::spread_posts(&mut posts, &mut rng);
        let after: Vec<Timestamp> = posts.iter().map(|p| p.scheduled_at).collect();
        assert_eq!(before, after);

        // Applying the pass twice to freshly spread posts changes nothing
        let mut crowded = vec![post_at(base), post_at(base + Duration::hours(2))];
        Scheduler::spread_posts(&mut crowded, &mut rng);
        let spread_once: Vec<Timestamp> = crowded.iter().map(|p| p.scheduled_at).collect();
        Scheduler::spread_posts(&mut crowded, &mut rng);
        let spread_twice: Vec<Timestamp> = crowded.iter().map(|p| p.scheduled_at).collect();
        assert_eq!(spread_once, spread_twice);
    }
}
