//! Love quiz scoring.
//!
//! A [`QuizSession`] walks the configured questions in order. Each
//! question accepts exactly one answer; the session finishes after the
//! last question is advanced past.

use serde::Serialize;

use crate::content::QuizQuestion;
use crate::error::CoreError;

/// Result of answering the current question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AnswerOutcome {
    Correct,
    Incorrect { correct_answer: String },
}

/// Final score once every question has been answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuizResult {
    pub score: usize,
    pub total: usize,
    /// Rounded to the nearest whole percent.
    pub percentage: u32,
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<QuizQuestion>,
    current: usize,
    score: usize,
    answered: Option<String>,
    finished: bool,
}

impl QuizSession {
    pub fn new(questions: Vec<QuizQuestion>) -> Self {
        let finished = questions.is_empty();
        Self {
            questions,
            current: 0,
            score: 0,
            answered: None,
            finished,
        }
    }

    /// The question awaiting an answer, or `None` once finished.
    pub fn current(&self) -> Option<&QuizQuestion> {
        if self.finished {
            None
        } else {
            self.questions.get(self.current)
        }
    }

    /// Zero-based index of the current question.
    pub fn position(&self) -> usize {
        self.current
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn score(&self) -> usize {
        self.score
    }

    /// The answer chosen for the current question, if any.
    pub fn selected(&self) -> Option<&str> {
        self.answered.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Answer the current question. A question can only be answered once.
    pub fn answer(&mut self, choice: &str) -> Result<AnswerOutcome, CoreError> {
        let question = self
            .current()
            .ok_or_else(|| CoreError::Validation("Quiz is already finished".to_string()))?;
        if self.answered.is_some() {
            return Err(CoreError::Validation(format!(
                "Question {} has already been answered",
                self.current + 1
            )));
        }

        let outcome = if choice == question.correct_answer {
            AnswerOutcome::Correct
        } else {
            AnswerOutcome::Incorrect {
                correct_answer: question.correct_answer.clone(),
            }
        };
        if outcome == AnswerOutcome::Correct {
            self.score += 1;
        }
        self.answered = Some(choice.to_string());
        Ok(outcome)
    }

    /// Move past the current question. Returns `false` once the quiz has
    /// finished.
    pub fn advance(&mut self) -> bool {
        if self.finished {
            return false;
        }
        self.answered = None;
        if self.current + 1 < self.questions.len() {
            self.current += 1;
            true
        } else {
            self.finished = true;
            false
        }
    }

    /// Score summary, available once finished.
    pub fn result(&self) -> Option<QuizResult> {
        if !self.finished {
            return None;
        }
        let total = self.questions.len();
        let percentage = if total == 0 {
            0
        } else {
            ((self.score as f64 / total as f64) * 100.0).round() as u32
        };
        Some(QuizResult {
            score: self.score,
            total,
            percentage,
        })
    }

    pub fn restart(&mut self) {
        self.current = 0;
        self.score = 0;
        self.answered = None;
        self.finished = self.questions.is_empty();
    }
}
