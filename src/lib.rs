pub mod clock;
pub mod config;
pub mod leaderboard;
pub mod name;
pub mod question;
pub mod quiz;
pub mod scoring;
pub mod tui;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Settings, SettingsError};
pub use leaderboard::{Leaderboard, LeaderboardEntry, LeaderboardError};
pub use name::{NameError, is_valid_name, validate_name};
pub use question::{Question, QuestionBank, QuestionError};
pub use quiz::{AnswerOutcome, Phase, QuizError, QuizEvent, QuizSignal, QuizState};
pub use scoring::{RankBand, RankTable, max_possible_score, points_for};
