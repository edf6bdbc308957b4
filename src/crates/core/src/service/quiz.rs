//! Topic quiz session

use crate::util::errors::{MentoraError, MentoraResult};
use crate::util::types::QuizQuestion;
use log::debug;
use serde::Serialize;

pub const PASSING_PERCENTAGE: u32 = 70;
pub const ANSWER_LETTERS: [&str; 4] = ["A", "B", "C", "D"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionReview {
    pub index: usize,
    pub answer: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizResults {
    pub score: usize,
    pub total: usize,
    pub percentage: u32,
    pub passed: bool,
    pub review: Vec<QuestionReview>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizStep {
    /// Moved to the question at this index
    Question(usize),
    Finished(QuizResults),
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<QuizQuestion>,
    current: usize,
    answers: Vec<Option<String>>,
    results: Option<QuizResults>,
}

impl QuizSession {
    pub fn new(questions: Vec<QuizQuestion>) -> Self {
        let answers = vec![None; questions.len()];
        Self {
            questions,
            current: 0,
            answers,
            results: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current)
    }

    pub fn selected_answer(&self) -> Option<&str> {
        self.answers.get(self.current).and_then(|a| a.as_deref())
    }

    pub fn is_last_question(&self) -> bool {
        !self.is_empty() && self.current == self.questions.len() - 1
    }

    pub fn is_finished(&self) -> bool {
        self.results.is_some()
    }

    pub fn results(&self) -> Option<&QuizResults> {
        self.results.as_ref()
    }

    /// Position through the quiz, counting the current question
    pub fn progress_percentage(&self) -> u32 {
        if self.is_empty() {
            return 0;
        }
        percentage(self.current + 1, self.questions.len())
    }

    fn ensure_active(&self) -> MentoraResult<()> {
        if self.is_empty() {
            return Err(MentoraError::validation(
                "No quiz questions available for this topic yet",
            ));
        }
        if self.is_finished() {
            return Err(MentoraError::validation("Quiz already finished"));
        }
        Ok(())
    }

    /// Record `letter` (A-D, any case) for the current question
    pub fn select_answer(&mut self, letter: &str) -> MentoraResult<()> {
        self.ensure_active()?;
        let letter = letter.trim().to_ascii_uppercase();
        if !ANSWER_LETTERS.contains(&letter.as_str()) {
            return Err(MentoraError::validation(format!(
                "Answer must be one of A, B, C, D, got '{}'",
                letter
            )));
        }
        self.answers[self.current] = Some(letter);
        Ok(())
    }

    /// Advance; on the last question this scores the quiz
    pub fn next(&mut self) -> MentoraResult<QuizStep> {
        self.ensure_active()?;
        if self.current + 1 < self.questions.len() {
            self.current += 1;
            return Ok(QuizStep::Question(self.current));
        }

        let results = self.score();
        debug!(
            "Quiz finished: score={}, total={}, percentage={}",
            results.score, results.total, results.percentage
        );
        self.results = Some(results.clone());
        Ok(QuizStep::Finished(results))
    }

    /// Step back; returns false on the first question
    pub fn previous(&mut self) -> bool {
        if self.is_finished() || self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    pub fn restart(&mut self) {
        self.current = 0;
        self.answers = vec![None; self.questions.len()];
        self.results = None;
    }

    fn score(&self) -> QuizResults {
        let review: Vec<QuestionReview> = self
            .questions
            .iter()
            .zip(&self.answers)
            .enumerate()
            .map(|(index, (question, answer))| QuestionReview {
                index,
                answer: answer.clone(),
                correct_answer: question.correct_answer.clone(),
                is_correct: answer.as_deref() == Some(question.correct_answer.as_str()),
            })
            .collect();

        let score = review.iter().filter(|r| r.is_correct).count();
        let total = self.questions.len();
        let percentage = percentage(score, total);
        QuizResults {
            score,
            total,
            percentage,
            passed: percentage >= PASSING_PERCENTAGE,
            review,
        }
    }
}

fn percentage(part: usize, total: usize) -> u32 {
    ((part as f64 / total as f64) * 100.0).round() as u32
}
