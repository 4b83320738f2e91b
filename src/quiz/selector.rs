use std::collections::HashSet;

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use super::bank::QuestionBank;
use super::{Level, Question};

/// Picks a random unused question at `level`.
///
/// Once every question of the level has been used the whole level is drawn from again.
/// Returns `None` only when the level has no questions at all.
pub fn select<'a, R: Rng + ?Sized>(
    bank: &'a QuestionBank,
    level: Level,
    used_ids: &HashSet<String>,
    rng: &mut R,
) -> Option<&'a Question> {
    let all = bank.questions(level);
    let pool: Vec<&Question> = all.iter().filter(|q| !used_ids.contains(&q.id)).collect();

    if pool.is_empty() {
        debug!("level {} exhausted, allowing repeats", level);
        return all.choose(rng);
    }

    pool.choose(rng).copied()
}
