//! Text renderings of results, sent to the chat with HTML parse mode.

use teloxide::utils::html::escape;

use crate::quiz::scoring::MAX_SCORE;
use crate::quiz::ResultEntry;

const BAR_WIDTH: u32 = 20;

pub fn render_result(user: &str, entry: &ResultEntry) -> String {
    let mut lines = vec![
        format!("<b>IQ assessment report - {}</b>", escape(user)),
        format!("Date (UTC): {}", entry.timestamp.format("%Y-%m-%d %H:%M:%S")),
        format!("Score: {}/{}", entry.correct_count, entry.total_answered),
        format!("Estimated IQ: <b>{}</b>", entry.estimated_score),
        format!("Suggestion: {}", escape(&entry.suggestion)),
    ];

    if !entry.answers.is_empty() {
        lines.push(String::new());
        lines.push("<b>Answers:</b>".to_string());
        for (i, answer) in entry.answers.iter().enumerate() {
            let status = if answer.is_correct { "Correct" } else { "Wrong" };
            lines.push(format!(
                "{}. ({}) {} -- {}",
                i + 1,
                answer.level,
                escape(&answer.text),
                status
            ));
        }
    }

    lines.join("\n")
}

/// One line per attempt with a bar scaled to the score.
pub fn render_history(user: &str, entries: &[ResultEntry]) -> String {
    if entries.is_empty() {
        return format!("No results yet for {}.", escape(user));
    }

    let mut lines = vec![format!("<b>IQ history - {}</b>", escape(user))];
    for entry in entries {
        let filled = (entry.estimated_score.min(MAX_SCORE) * BAR_WIDTH / MAX_SCORE) as usize;
        lines.push(format!(
            "<code>{} {:>3} {}</code>",
            entry.timestamp.format("%Y-%m-%d"),
            entry.estimated_score,
            "█".repeat(filled)
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::quiz::{AnsweredQuestion, Level};

    fn entry(score: u32, answers: Vec<AnsweredQuestion>) -> ResultEntry {
        ResultEntry {
            timestamp: Utc.with_ymd_and_hms(2024, 3, 9, 8, 30, 0).unwrap(),
            total_answered: answers.len(),
            correct_count: answers.iter().filter(|a| a.is_correct).count(),
            estimated_score: score,
            suggestion: "Practise".into(),
            answers,
        }
    }

    #[test]
    fn result_lists_every_answer() {
        let answers = vec![
            AnsweredQuestion {
                question_id: "1".into(),
                text: "Is 2 < 3?".into(),
                selected_option: "0".into(),
                is_correct: true,
                level: Level::Basic,
                options: vec!["yes".into(), "no".into()],
            },
            AnsweredQuestion {
                question_id: "2".into(),
                text: "Next in 2, 4, 8?".into(),
                selected_option: "1".into(),
                is_correct: false,
                level: Level::Advanced,
                options: vec!["16".into(), "10".into()],
            },
        ];
        let text = render_result("ana", &entry(103, answers));

        assert!(text.contains("Date (UTC): 2024-03-09 08:30:00"));
        assert!(text.contains("Score: 1/2"));
        assert!(text.contains("Estimated IQ: <b>103</b>"));
        assert!(text.contains("1. (basic) Is 2 &lt; 3? -- Correct"));
        assert!(text.contains("2. (advanced) Next in 2, 4, 8? -- Wrong"));
    }

    #[test]
    fn history_bars_scale_with_score() {
        let text = render_history("ana", &[entry(80, vec![]), entry(160, vec![])]);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains(" 80 ██████████<"));
        assert!(lines[2].contains(&"█".repeat(20)));
    }

    #[test]
    fn empty_history() {
        assert_eq!(render_history("ana", &[]), "No results yet for ana.");
    }
}
