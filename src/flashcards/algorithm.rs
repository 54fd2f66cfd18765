//! SM-2 spaced repetition scheduling.
//!
//! SuperMemo 2 over the flat per-card state (interval, ease factor, next
//! review date). Quality ratings (0-5):
//! - 0-2: incorrect recall
//! - 3: correct with serious difficulty
//! - 4: correct after hesitation
//! - 5: perfect response

use chrono::{Duration, NaiveDate, Utc};

use super::models::FlashCard;

/// Minimum ease factor allowed.
const MIN_EASE_FACTOR: f32 = 1.3;

/// Result of scheduling the next review.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub interval: i32,
    pub ease_factor: f32,
    pub next_review_date: NaiveDate,
}

/// Calculate the next interval and ease factor for a card after a review.
pub fn schedule_review(card: &FlashCard, quality: i32) -> ReviewOutcome {
    let quality = quality.clamp(0, 5);

    let mut ease_factor = card.ease_factor;
    let interval;

    if quality >= 3 {
        interval = match card.interval {
            // Never reviewed, or reset: 1 day
            0 => 1,
            // Second step: 6 days
            1 => 6,
            // Afterwards: multiply by ease factor
            n => (n as f32 * ease_factor).round() as i32,
        };

        // EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02))
        ease_factor += 0.1 - (5 - quality) as f32 * (0.08 + (5 - quality) as f32 * 0.02);
        ease_factor = ease_factor.max(MIN_EASE_FACTOR);
    } else {
        // Incorrect response: back to the start, ease penalized
        interval = 1;
        ease_factor = (ease_factor - 0.2).max(MIN_EASE_FACTOR);
    }

    ReviewOutcome {
        interval,
        ease_factor,
        next_review_date: Utc::now().date_naive() + Duration::days(interval as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flashcards::models::Difficulty;

    fn new_card() -> FlashCard {
        FlashCard::new(1, 1, "q".into(), "a".into(), Difficulty::Easy)
    }

    #[test]
    fn test_first_review_correct() {
        let card = new_card();
        let outcome = schedule_review(&card, 4);

        assert_eq!(outcome.interval, 1);
        assert!(outcome.ease_factor >= 2.5 - 0.16);
    }

    #[test]
    fn test_second_review_correct() {
        let mut card = new_card();
        card.interval = 1;

        let outcome = schedule_review(&card, 4);
        assert_eq!(outcome.interval, 6);
    }

    #[test]
    fn test_subsequent_review_multiplies_by_ease() {
        let mut card = new_card();
        card.interval = 10;
        card.ease_factor = 2.5;

        let outcome = schedule_review(&card, 4);
        assert_eq!(outcome.interval, 25);
    }

    #[test]
    fn test_incorrect_resets_interval() {
        let mut card = new_card();
        card.interval = 30;

        let outcome = schedule_review(&card, 1);
        assert_eq!(outcome.interval, 1);
        assert!(outcome.ease_factor < card.ease_factor);
    }

    #[test]
    fn test_ease_factor_never_below_minimum() {
        let mut card = new_card();
        card.ease_factor = 1.35;
        card.interval = 10;

        let outcome = schedule_review(&card, 0);
        assert!(outcome.ease_factor >= MIN_EASE_FACTOR);

        card.ease_factor = outcome.ease_factor;
        let again = schedule_review(&card, 0);
        assert!(again.ease_factor >= MIN_EASE_FACTOR);
    }

    #[test]
    fn test_next_review_date_matches_interval() {
        let mut card = new_card();
        card.interval = 10;
        card.ease_factor = 2.0;

        let outcome = schedule_review(&card, 5);
        let expected = Utc::now().date_naive() + Duration::days(outcome.interval as i64);
        assert_eq!(outcome.next_review_date, expected);
    }
}
