//! Quiz runner and quiz draft editor
//!
//! `QuizRunner` walks a fixed list of questions one at a time. Answers are kept
//! per question index and only scored once, when the learner moves past the
//! last question. `QuizDraft` is the admin-side editor for a single question
//! whose option list can never leave the 2..=6 range.

use std::collections::BTreeMap;

use serde::Serialize;
use uuid::Uuid;

use crate::models::{Quiz, QuizError, MAX_OPTIONS, MIN_OPTIONS};

/// Final score of an attempt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub correct: usize,
    pub incorrect: usize,
}

/// Result of asking the runner to move forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextOutcome {
    /// Moved to the given question index
    Advanced(usize),
    /// The current question has no answer yet, nothing changed
    NeedsAnswer,
    /// The last question was answered and the attempt was scored
    Completed(Tally),
    /// The attempt was already scored, nothing changed
    AlreadyCompleted(Tally),
}

/// Per-question state machine for one attempt at a resource's quiz
#[derive(Debug, Clone)]
pub struct QuizRunner {
    attempt_id: Uuid,
    quizzes: Vec<Quiz>,
    current_index: usize,
    answers: BTreeMap<usize, String>,
    completed: bool,
    tally: Tally,
}

impl QuizRunner {
    pub fn new(quizzes: Vec<Quiz>) -> Result<Self, QuizError> {
        if quizzes.is_empty() {
            return Err(QuizError::Empty);
        }
        Ok(Self {
            attempt_id: Uuid::new_v4(),
            quizzes,
            current_index: 0,
            answers: BTreeMap::new(),
            completed: false,
            tally: Tally::default(),
        })
    }

    pub fn attempt_id(&self) -> Uuid {
        self.attempt_id
    }

    pub fn len(&self) -> usize {
        self.quizzes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quizzes.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> &Quiz {
        &self.quizzes[self.current_index]
    }

    pub fn answers(&self) -> &BTreeMap<usize, String> {
        &self.answers
    }

    pub fn answer_for(&self, index: usize) -> Option<&str> {
        self.answers.get(&index).map(String::as_str)
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 == self.quizzes.len()
    }

    /// Records (or replaces) the answer of question `index` without moving
    pub fn select_answer(&mut self, index: usize, option: &str) -> Result<(), QuizError> {
        if self.completed {
            return Err(QuizError::AlreadyCompleted);
        }
        let quiz = self
            .quizzes
            .get(index)
            .ok_or(QuizError::NoSuchQuestion(index))?;
        if !quiz.offers(option) {
            return Err(QuizError::UnknownOption {
                index,
                option: option.to_string(),
            });
        }
        self.answers.insert(index, option.to_string());
        Ok(())
    }

    pub fn next(&mut self) -> NextOutcome {
        if self.completed {
            return NextOutcome::AlreadyCompleted(self.tally);
        }
        if !self.answers.contains_key(&self.current_index) {
            log::debug!(
                "quiz {}: question {} has no answer yet",
                self.attempt_id,
                self.current_index
            );
            return NextOutcome::NeedsAnswer;
        }

        if self.is_last_question() {
            self.tally = self.score();
            self.completed = true;
            log::info!(
                "quiz {} completed: {} correct, {} incorrect",
                self.attempt_id,
                self.tally.correct,
                self.tally.incorrect
            );
            return NextOutcome::Completed(self.tally);
        }

        self.current_index = (self.current_index + 1).min(self.quizzes.len() - 1);
        NextOutcome::Advanced(self.current_index)
    }

    /// Steps back one question; answers stay recorded
    pub fn previous(&mut self) -> usize {
        self.current_index = self.current_index.saturating_sub(1);
        self.current_index
    }

    /// Starts a fresh attempt over the same questions
    pub fn retake(&mut self) {
        self.attempt_id = Uuid::new_v4();
        self.answers.clear();
        self.current_index = 0;
        self.tally = Tally::default();
        self.completed = false;
        log::debug!("quiz retake, new attempt {}", self.attempt_id);
    }

    fn score(&self) -> Tally {
        let correct = self
            .answers
            .iter()
            .filter(|(index, answer)| {
                self.quizzes
                    .get(**index)
                    .map(|quiz| quiz.correct_answer() == answer.as_str())
                    .unwrap_or(false)
            })
            .count();
        Tally {
            correct,
            incorrect: self.answers.len() - correct,
        }
    }
}

/// Editable question used by the resource form.
///
/// Unlike [`Quiz`] a draft may hold blank text while the admin is typing, but
/// its option count is kept within bounds on every edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDraft {
    pub question: String,
    options: Vec<String>,
    pub correct_answer: String,
}

impl Default for QuizDraft {
    fn default() -> Self {
        Self {
            question: String::new(),
            options: vec![String::new(); MIN_OPTIONS],
            correct_answer: String::new(),
        }
    }
}

impl QuizDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn add_option(&mut self) -> Result<usize, QuizError> {
        if self.options.len() >= MAX_OPTIONS {
            return Err(QuizError::TooManyOptions);
        }
        self.options.push(String::new());
        Ok(self.options.len() - 1)
    }

    pub fn remove_option(&mut self, index: usize) -> Result<String, QuizError> {
        if index >= self.options.len() {
            return Err(QuizError::NoSuchOption(index));
        }
        if self.options.len() <= MIN_OPTIONS {
            return Err(QuizError::TooFewOptions);
        }
        let removed = self.options.remove(index);
        if removed == self.correct_answer {
            self.correct_answer.clear();
        }
        Ok(removed)
    }

    pub fn set_option(&mut self, index: usize, text: impl Into<String>) -> Result<(), QuizError> {
        let slot = self
            .options
            .get_mut(index)
            .ok_or(QuizError::NoSuchOption(index))?;
        *slot = text.into();
        Ok(())
    }

    /// Converts to a validated [`Quiz`]
    pub fn build(&self) -> Result<Quiz, QuizError> {
        Quiz::new(
            self.question.clone(),
            self.options.clone(),
            self.correct_answer.clone(),
        )
    }
}

impl From<&Quiz> for QuizDraft {
    fn from(quiz: &Quiz) -> Self {
        Self {
            question: quiz.question().to_string(),
            options: quiz.options().to_vec(),
            correct_answer: quiz.correct_answer().to_string(),
        }
    }
}
