//! Quiz grading

use crate::error::{Error, Result};
use crate::types::{Quiz, QuizChoice};
use serde::Serialize;

/// Shown when neither the chosen nor the correct choice carries an explanation.
pub const DEFAULT_EXPLANATION: &str = "No explanation available for this question.";

/// Result of grading one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizFeedback {
    pub quiz_id: String,
    pub choice_id: String,
    pub is_correct: bool,
    pub explanation: String,
    /// The correct choice's text, only when the answer was wrong
    pub sample_answer: Option<String>,
}

/// Grade `choice_id` against `quiz`.
pub fn grade_answer(quiz: &Quiz, choice_id: &str) -> Result<QuizFeedback> {
    let chosen = quiz
        .choices
        .iter()
        .find(|c| c.choice_id == choice_id)
        .ok_or_else(|| Error::InvalidAnswer {
            quiz_id: quiz.quiz_id.clone(),
            choice_id: choice_id.to_string(),
        })?;

    let correct = correct_choice(quiz)?;
    let is_correct = chosen.is_correct;

    let explanation = chosen
        .explanation
        .as_deref()
        .filter(|e| !e.trim().is_empty())
        .or_else(|| {
            correct
                .explanation
                .as_deref()
                .filter(|e| !e.trim().is_empty())
        })
        .unwrap_or(DEFAULT_EXPLANATION)
        .to_string();

    Ok(QuizFeedback {
        quiz_id: quiz.quiz_id.clone(),
        choice_id: choice_id.to_string(),
        is_correct,
        explanation,
        sample_answer: (!is_correct).then(|| correct.choice_text.clone()),
    })
}

/// The first choice marked correct.
pub fn correct_choice(quiz: &Quiz) -> Result<&QuizChoice> {
    quiz.choices
        .iter()
        .find(|c| c.is_correct)
        .ok_or_else(|| Error::QuizMisconfigured(quiz.quiz_id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JlptLevel;

    fn quiz() -> Quiz {
        Quiz {
            quiz_id: "quiz-1-1".to_string(),
            story_id: "1".to_string(),
            question_text: "たなかさんはどこへいきましたか。".to_string(),
            difficulty_level: JlptLevel::N5,
            choices: vec![
                QuizChoice {
                    choice_id: "a".to_string(),
                    choice_text: "えき".to_string(),
                    is_correct: true,
                    explanation: Some("本文に「えきへいきました」とあります。".to_string()),
                },
                QuizChoice {
                    choice_id: "b".to_string(),
                    choice_text: "がっこう".to_string(),
                    is_correct: false,
                    explanation: None,
                },
                QuizChoice {
                    choice_id: "c".to_string(),
                    choice_text: "びょういん".to_string(),
                    is_correct: false,
                    explanation: Some("病院には行っていません。".to_string()),
                },
            ],
        }
    }

    #[test]
    fn test_correct_answer() {
        let feedback = grade_answer(&quiz(), "a").unwrap();
        assert!(feedback.is_correct);
        assert!(feedback.sample_answer.is_none());
        assert!(feedback.explanation.contains("えき"));
    }

    #[test]
    fn test_wrong_answer_uses_own_explanation() {
        let feedback = grade_answer(&quiz(), "c").unwrap();
        assert!(!feedback.is_correct);
        assert_eq!(feedback.explanation, "病院には行っていません。");
        assert_eq!(feedback.sample_answer.as_deref(), Some("えき"));
    }

    #[test]
    fn test_wrong_answer_falls_back_to_correct_explanation() {
        let feedback = grade_answer(&quiz(), "b").unwrap();
        assert!(feedback.explanation.contains("えきへいきました"));
    }

    #[test]
    fn test_default_explanation() {
        let mut q = quiz();
        for c in &mut q.choices {
            c.explanation = None;
        }
        assert_eq!(grade_answer(&q, "b").unwrap().explanation, DEFAULT_EXPLANATION);
    }

    #[test]
    fn test_unknown_choice() {
        assert!(matches!(
            grade_answer(&quiz(), "z"),
            Err(Error::InvalidAnswer { .. })
        ));
    }

    #[test]
    fn test_no_correct_choice() {
        let mut q = quiz();
        q.choices[0].is_correct = false;
        assert!(matches!(
            grade_answer(&q, "a"),
            Err(Error::QuizMisconfigured(id)) if id == "quiz-1-1"
        ));
    }
}
