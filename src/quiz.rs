use chrono::{DateTime, Local};

use crate::config::Settings;
use crate::question::Question;
use crate::scoring::points_for;

/// Where a session currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NotStarted,
    /// Waiting for an answer to the question at this index.
    InProgress(usize),
    /// The question at this index was answered; waiting for `advance`.
    Answered(usize),
    Finished,
}

/// Input to the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizEvent {
    Start(Vec<Question>),
    Tick,
    Select(usize),
    Submit,
    Advance,
}

/// One-shot notifications for the presentation layer. They never affect scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizSignal {
    /// Remaining time just crossed into the final warning window.
    FinalCountdown,
    /// The question expired unanswered.
    TimeUp,
    WrongAnswer,
    Correct { points: u32 },
    Finished,
}

/// What happened on the last submitted answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub selected: usize,
    pub correct: bool,
    pub points: u32,
    pub elapsed_secs: u32,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("no questions are loaded, a session cannot start")]
    NoQuestions,
}

/// Per-session quiz state.
///
/// Timing is never accumulated from ticks. Every transition receives the
/// current instant and recomputes elapsed time from `question_started_at`,
/// so missed ticks are caught up on the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizState {
    settings: Settings,
    questions: Vec<Question>,
    phase: Phase,
    score: u32,
    question_started_at: DateTime<Local>,
    answered: bool,
    selected: Option<usize>,
    final_warning_played: bool,
    last_outcome: Option<AnswerOutcome>,
}

impl QuizState {
    pub fn new(settings: Settings, now: DateTime<Local>) -> Self {
        Self {
            settings,
            questions: Vec::new(),
            phase: Phase::NotStarted,
            score: 0,
            question_started_at: now,
            answered: false,
            selected: None,
            final_warning_played: false,
            last_outcome: None,
        }
    }

    /// Applies `event` to a copy of this state and returns the successor with
    /// the signals it raised. `self` is left untouched.
    pub fn apply(
        &self,
        event: QuizEvent,
        now: DateTime<Local>,
    ) -> Result<(QuizState, Vec<QuizSignal>), QuizError> {
        let mut next = self.clone();
        let signals = match event {
            QuizEvent::Start(questions) => next.start(questions, now)?,
            QuizEvent::Tick => next.tick(now),
            QuizEvent::Select(option) => {
                next.select(option);
                Vec::new()
            }
            QuizEvent::Submit => next.submit(now),
            QuizEvent::Advance => next.advance(now),
        };
        Ok((next, signals))
    }

    /// Begins (or restarts) a session with a freshly loaded question set.
    ///
    /// # Errors
    /// Returns [`QuizError::NoQuestions`] for an empty set, leaving the state unchanged.
    pub fn start(
        &mut self,
        questions: Vec<Question>,
        now: DateTime<Local>,
    ) -> Result<Vec<QuizSignal>, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }

        self.questions = questions;
        self.score = 0;
        self.last_outcome = None;
        self.phase = Phase::InProgress(0);
        self.reset_question(now);
        Ok(Vec::new())
    }

    pub fn tick(&mut self, now: DateTime<Local>) -> Vec<QuizSignal> {
        let mut signals = Vec::new();
        if !matches!(self.phase, Phase::InProgress(_)) || self.answered {
            return signals;
        }

        let remaining = self.remaining_secs(now);
        if remaining == 0 {
            self.expire(now, &mut signals);
        } else if remaining <= self.settings.final_warning_secs && !self.final_warning_played {
            self.final_warning_played = true;
            signals.push(QuizSignal::FinalCountdown);
        }
        signals
    }

    /// Highlights an option on the open question. Ignored once answered.
    pub fn select(&mut self, option: usize) {
        let Phase::InProgress(index) = self.phase else {
            return;
        };
        if self.answered || option >= self.questions[index].options().len() {
            return;
        }
        self.selected = Some(option);
    }

    /// Locks in the highlighted option (the first one if none was highlighted).
    ///
    /// A question that already ran out of time is expired instead and the
    /// submission is dropped. Submitting an answered question does nothing.
    pub fn submit(&mut self, now: DateTime<Local>) -> Vec<QuizSignal> {
        let mut signals = Vec::new();
        let Phase::InProgress(index) = self.phase else {
            return signals;
        };
        if self.answered {
            return signals;
        }

        if self.remaining_secs(now) == 0 {
            self.expire(now, &mut signals);
            return signals;
        }

        let elapsed_secs = self.elapsed_secs(now);
        let selected = self.selected.unwrap_or(0);
        let correct = self.questions[index].is_correct(selected);
        let points = points_for(correct, f64::from(elapsed_secs), &self.settings);

        self.score = self.score.saturating_add(points);
        self.answered = true;
        self.selected = Some(selected);
        self.phase = Phase::Answered(index);
        self.last_outcome = Some(AnswerOutcome {
            selected,
            correct,
            points,
            elapsed_secs,
        });

        signals.push(if correct {
            QuizSignal::Correct { points }
        } else {
            QuizSignal::WrongAnswer
        });
        signals
    }

    pub fn advance(&mut self, now: DateTime<Local>) -> Vec<QuizSignal> {
        let mut signals = Vec::new();
        if let Phase::Answered(index) = self.phase {
            self.move_past(index, now, &mut signals);
        }
        signals
    }

    fn expire(&mut self, now: DateTime<Local>, signals: &mut Vec<QuizSignal>) {
        if let Phase::InProgress(index) = self.phase {
            log::debug!("question {} timed out", index + 1);
            signals.push(QuizSignal::TimeUp);
            self.last_outcome = None;
            self.move_past(index, now, signals);
        }
    }

    fn move_past(&mut self, index: usize, now: DateTime<Local>, signals: &mut Vec<QuizSignal>) {
        let next = index + 1;
        if next >= self.questions.len() {
            self.phase = Phase::Finished;
            signals.push(QuizSignal::Finished);
        } else {
            self.phase = Phase::InProgress(next);
            self.last_outcome = None;
        }
        self.reset_question(now);
    }

    fn reset_question(&mut self, now: DateTime<Local>) {
        self.question_started_at = now;
        self.answered = false;
        self.selected = None;
        self.final_warning_played = false;
    }

    /// Whole seconds since the current question appeared. A clock that moved
    /// backwards counts as zero.
    pub fn elapsed_secs(&self, now: DateTime<Local>) -> u32 {
        let seconds = (now - self.question_started_at).num_seconds();
        u32::try_from(seconds.max(0)).unwrap_or(u32::MAX)
    }

    pub fn remaining_secs(&self, now: DateTime<Local>) -> u32 {
        self.settings
            .time_limit_secs
            .saturating_sub(self.elapsed_secs(now))
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_answered(&self) -> bool {
        self.answered
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn final_warning_played(&self) -> bool {
        self.final_warning_played
    }

    pub fn last_outcome(&self) -> Option<AnswerOutcome> {
        self.last_outcome
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn total(&self) -> usize {
        self.questions.len()
    }

    pub fn current_index(&self) -> Option<usize> {
        match self.phase {
            Phase::InProgress(index) | Phase::Answered(index) => Some(index),
            Phase::NotStarted | Phase::Finished => None,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.current_index().map(|index| &self.questions[index])
    }

    /// 1-based number of the question on screen, clamped to the total.
    pub fn question_number(&self) -> usize {
        match self.phase {
            Phase::NotStarted => 0,
            Phase::InProgress(index) | Phase::Answered(index) => index + 1,
            Phase::Finished => self.total(),
        }
    }

    /// Share of questions already behind the player.
    pub fn progress_percent(&self) -> u16 {
        let completed = match self.phase {
            Phase::NotStarted => 0,
            Phase::InProgress(index) | Phase::Answered(index) => index,
            Phase::Finished => return 100,
        };
        if self.questions.is_empty() {
            return 0;
        }
        (100 * completed / self.questions.len()) as u16
    }

    pub fn rank(&self) -> &str {
        self.settings.ranks.rank_for(self.score)
    }
}
