use super::Level;

/// Picks the level for the next question.
///
/// A correct answer with a positive streak moves one tier up, a wrong answer moves one tier
/// down. Both stop at the ends of the scale.
pub fn next_level(current: Level, was_correct: bool, streak_after_answer: u32) -> Level {
    if was_correct {
        if streak_after_answer >= 1 {
            return current.higher().unwrap_or(current);
        }
        return current;
    }
    current.lower().unwrap_or(current)
}
