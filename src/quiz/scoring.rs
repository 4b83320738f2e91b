use super::{AnsweredQuestion, Level};

/// Score given to an attempt with no answers.
pub const BASELINE_SCORE: u32 = 85;
pub const MIN_SCORE: u32 = 60;
pub const MAX_SCORE: u32 = 160;

const BASE: f64 = 80.0;
const SPREAD: f64 = 45.0;

pub fn level_weight(level: Level) -> f64 {
    match level {
        Level::Basic => 0.9,
        Level::Intermediate => 1.0,
        Level::Advanced => 1.1,
    }
}

/// Estimated ability score for a list of answers.
///
/// Correct answers count with their level weight; the weighted share of correct answers
/// (at most 1.1 with the current weights) is mapped onto `80 + ratio * 45` and clamped.
pub fn estimate(answers: &[AnsweredQuestion]) -> u32 {
    if answers.is_empty() {
        return BASELINE_SCORE;
    }

    let weighted_correct: f64 = answers
        .iter()
        .filter(|a| a.is_correct)
        .map(|a| level_weight(a.level))
        .sum();
    let ratio = weighted_correct / answers.len() as f64;
    let raw = (BASE + ratio * SPREAD).round_ties_even();

    raw.clamp(MIN_SCORE as f64, MAX_SCORE as f64) as u32
}

pub fn suggestion(score: u32) -> &'static str {
    if score < 90 {
        return "Reinforce the basics: practise number series, patterns and step-by-step reasoning.";
    }
    if score < 110 {
        return "Solid base. Work on intermediate reasoning questions to gain speed.";
    }
    "Great performance! Try complex challenges and multi-step problems."
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(n: usize, correct: bool, level: Level) -> Vec<AnsweredQuestion> {
        (0..n)
            .map(|i| AnsweredQuestion {
                question_id: format!("q{}", i),
                text: String::new(),
                selected_option: "0".into(),
                is_correct: correct,
                level,
                options: vec![],
            })
            .collect()
    }

    #[test]
    fn empty_is_baseline() {
        assert_eq!(estimate(&[]), 85);
    }

    #[test]
    fn all_correct_intermediate() {
        assert_eq!(estimate(&answers(10, true, Level::Intermediate)), 125);
    }

    #[test]
    fn all_wrong() {
        assert_eq!(estimate(&answers(10, false, Level::Advanced)), 80);
    }

    #[test]
    fn all_correct_advanced_tops_out_below_max() {
        // weights push the ratio above 1, the score still lands well under the cap
        assert_eq!(estimate(&answers(4, true, Level::Advanced)), 130);
    }

    #[test]
    fn half_rounds_to_even() {
        // 80 + 0.9 * 45 = 120.5
        assert_eq!(estimate(&answers(1, true, Level::Basic)), 120);
    }

    #[test]
    fn mixed_levels() {
        let mut list = answers(2, true, Level::Basic);
        list.extend(answers(1, true, Level::Advanced));
        list.extend(answers(1, false, Level::Intermediate));
        // (0.9 + 0.9 + 1.1) / 4 = 0.725 -> 112.625
        assert_eq!(estimate(&list), 113);
    }

    #[test]
    fn always_within_bounds() {
        for level in Level::ALL {
            for n in 1..12 {
                for correct in 0..=n {
                    let mut list = answers(correct, true, level);
                    list.extend(answers(n - correct, false, level));
                    let score = estimate(&list);
                    assert!((MIN_SCORE..=MAX_SCORE).contains(&score));
                }
            }
        }
    }

    #[test]
    fn suggestion_bands() {
        assert_eq!(suggestion(89), suggestion(60));
        assert_eq!(suggestion(90), suggestion(109));
        assert_eq!(suggestion(110), suggestion(160));
        assert_ne!(suggestion(89), suggestion(90));
        assert_ne!(suggestion(109), suggestion(110));
    }
}
