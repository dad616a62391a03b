//! Rule heuristics for the six quality factors
//!
//! Each function scores one dimension of a candidate post on a 0-10 scale
//! and optionally returns a short note explaining the dominant signal.
//! The heuristics are deliberately cheap: plain substring and token checks,
//! no NLU.

use std::collections::HashSet;

use crate::calendar::PlannedPost;
use crate::guardrails::PROMO_PHRASES;
use crate::model::{Company, Persona, Subreddit, Theme};

const OPEN_INVITES: &[&str] = &[
    "what do you",
    "what's your",
    "how do you",
    "how did you",
    "curious",
    "would love",
    "am i missing",
    "anyone else",
];

const QUESTION_OPENERS: &[&str] = &["what", "how", "why", "anyone", "who", "when", "has", "does"];

const SALES_MARKERS: &[&str] = &["synergy", "leverage", "solution", "revolutionary", "seamless"];

const CASUAL_MARKERS: &[&str] = &["don't", "i've", "we're", "honest", "actually", "feels"];

fn full_text(post: &PlannedPost) -> String {
    format!(
        "{} {}",
        post.title,
        post.body.as_deref().unwrap_or(&post.body_preview)
    )
    .to_lowercase()
}

/// Does the post invite discussion rather than broadcast?
pub fn open_endedness(post: &PlannedPost) -> (f64, Option<String>) {
    let text = full_text(post);

    if !text.contains('?') {
        return (2.0, Some("no question anywhere in the post".to_string()));
    }

    let mut score: f64 = 5.0 + 2.0;
    let title = post.title.to_lowercase();
    if QUESTION_OPENERS
        .iter()
        .any(|w| title.starts_with(w))
    {
        score += 1.5;
    }
    if OPEN_INVITES.iter().any(|p| text.contains(p)) {
        score += 1.5;
    }

    (score.clamp(0.0, 10.0), None)
}

/// Absence of self-promotional or marketing language
pub fn non_promotional(post: &PlannedPost, company: &Company) -> (f64, Option<String>) {
    let text = full_text(post);
    let mut score: f64 = 10.0;
    let mut hits = Vec::new();

    for phrase in PROMO_PHRASES {
        if text.contains(phrase) {
            score -= 2.0;
            hits.push(*phrase);
        }
    }

    let company_name = company.name.trim().to_lowercase();
    let comparison = text.contains(" vs ") || text.contains(" versus ");
    if !company_name.is_empty() && text.contains(&company_name) && !comparison {
        score -= 1.0;
        hits.push("company name");
    }

    if text.contains("http://") || text.contains("https://") {
        score -= 1.0;
        hits.push("link");
    }

    let detail = if hits.is_empty() {
        None
    } else {
        Some(format!("flagged: {}", hits.join(", ")))
    };
    (score.clamp(0.0, 10.0), detail)
}

/// Does the post read like it belongs in the subreddit?
pub fn subreddit_fit(post: &PlannedPost, subreddit: &Subreddit) -> (f64, Option<String>) {
    let text = full_text(post);
    let mut score: f64 = 5.0;

    if let Some(notes) = &subreddit.culture_notes {
        let notes = notes.to_lowercase();
        if notes
            .split_whitespace()
            .any(|token| token.len() > 3 && text.contains(token))
        {
            score += 1.5;
        }
    }

    if CASUAL_MARKERS.iter().any(|m| text.contains(m)) {
        score += 1.0;
    }
    if SALES_MARKERS.iter().any(|m| text.contains(m)) {
        score -= 1.5;
    }
    if post.title.len() <= 80 {
        score += 0.5;
    }

    (score.clamp(0.0, 10.0), None)
}

/// Can this author plausibly speak to this topic?
pub fn author_credibility(
    post: &PlannedPost,
    author: &Persona,
    theme: &Theme,
) -> (f64, Option<String>) {
    let background = author.background.to_lowercase();
    let keyword = theme.keyword.to_lowercase();
    let mut score = 4.0;
    let mut overlap = 0;

    for token in keyword.split_whitespace() {
        if token.len() > 3 && background.contains(token) {
            overlap += 1;
        }
    }
    score += (overlap as f64 * 2.0).min(4.0);

    if author.role.is_some() {
        score += 1.0;
    }

    let title = post.title.to_lowercase();
    if background
        .split_whitespace()
        .any(|token| token.len() > 4 && title.contains(token))
    {
        score += 0.5;
    }

    let detail = if overlap == 0 {
        Some("author background does not mention the theme".to_string())
    } else {
        None
    };
    (score.clamp(0.0, 10.0), detail)
}

/// Does the comment thread read like a real conversation?
pub fn thread_naturalness(post: &PlannedPost) -> (f64, Option<String>) {
    if post.comments.is_empty() {
        return (3.0, Some("no planned comments".to_string()));
    }

    let mut score: f64 = 5.0;

    let delays: HashSet<i64> = post.comments.iter().map(|c| c.delay_minutes).collect();
    if delays.len() == post.comments.len() {
        score += 1.0;
    }

    let authors: HashSet<&str> = post
        .comments
        .iter()
        .map(|c| c.author_id.as_str())
        .collect();
    if authors.len() >= 2 || post.comments.len() == 1 {
        score += 1.0;
    }

    if post
        .comments
        .iter()
        .all(|c| (20..=400).contains(&c.seed_text.len()))
    {
        score += 1.5;
    }

    let texts: HashSet<&str> = post
        .comments
        .iter()
        .map(|c| c.seed_text.as_str())
        .collect();
    let duplicated = texts.len() < post.comments.len();
    if duplicated {
        score -= 3.0;
    }

    if post.comments.iter().any(|c| c.parent_id.is_some()) {
        score += 1.0;
    }

    if post
        .comments
        .windows(2)
        .all(|w| w[0].delay_minutes < w[1].delay_minutes)
    {
        score += 0.5;
    }

    let detail = duplicated.then(|| "duplicate comment text".to_string());
    (score.clamp(0.0, 10.0), detail)
}

/// General engagement potential of the post
pub fn engagement_potential(post: &PlannedPost) -> (f64, Option<String>) {
    let body = post.body.as_deref().unwrap_or(&post.body_preview);
    let mut score: f64 = 5.0;

    match body.len() {
        150..=900 => score += 1.5,
        80..=149 => score += 0.5,
        0..=79 => score -= 1.0,
        _ => {}
    }

    if body.contains('?') {
        score += 1.0;
    }
    if body.chars().any(|c| c.is_ascii_digit()) {
        score += 0.5;
    }
    if post.title.split_whitespace().count() <= 12 {
        score += 0.5;
    }

    (score.clamp(0.0, 10.0), None)
}
