//! Terminal front end.
//!
//! Reads the quiz state to render and turns key presses and timer ticks into
//! state machine events. All rules live in the library modules.

use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use rand::SeedableRng;
use rand::rngs::StdRng;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Gauge, List, ListItem, Paragraph, Row, Table, Wrap},
};

use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::leaderboard::{Leaderboard, LeaderboardEntry, TOP_HIGHLIGHT};
use crate::name::validate_name;
use crate::question::{Question, QuestionBank};
use crate::quiz::{Phase, QuizSignal, QuizState};
use crate::scoring::max_possible_score;

/// Period of the timer tick when no key is pressed.
pub const TICK_RATE: Duration = Duration::from_secs(1);

const STUDY_MATERIAL_URL: &str =
    "https://drive.google.com/drive/folders/1gM21hO56URb9LMkaAz8CY_OEldqJ29pt?usp=sharing";

/// Color scheme
pub struct Theme {
    pub fg: Color,
    pub accent: Color,
    pub alert: Color,
    pub success: Color,
    pub warning: Color,
    pub border: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: Color::White,
            accent: Color::Cyan,
            alert: Color::Red,
            success: Color::Green,
            warning: Color::Yellow,
            border: Color::DarkGray,
        }
    }
}

fn styled_block<'a>(title: &str, theme: &Theme) -> Block<'a> {
    Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
}

/// Transient feedback line shown under the question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Countdown,
    TimeUp,
    Wrong { correct: String },
    Correct { points: u32 },
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    NotSaved,
    Invalid(String),
    Saved { position: usize },
    Failed(String),
}

pub struct App<C: Clock + Clone = SystemClock> {
    pub running: bool,
    settings: Settings,
    quiz: QuizState,
    leaderboard: Leaderboard<C>,
    clock: C,
    rng: StdRng,
    theme: Theme,
    next_questions: Option<Vec<Question>>,
    available: usize,
    cursor: usize,
    notice: Option<Notice>,
    name_input: String,
    save_status: SaveStatus,
    board: Vec<LeaderboardEntry>,
}

impl App<SystemClock> {
    /// `questions` is the set for the first session; restarts reload from disk.
    pub fn new(settings: Settings, questions: Vec<Question>) -> Self {
        Self::with_parts(settings, questions, SystemClock, StdRng::from_entropy())
    }
}

impl<C: Clock + Clone> App<C> {
    pub fn with_parts(settings: Settings, questions: Vec<Question>, clock: C, rng: StdRng) -> Self {
        let available = questions.len();
        let leaderboard = Leaderboard::with_clock(settings.leaderboard_path.clone(), clock.clone());
        let quiz = QuizState::new(settings.clone(), clock.now());

        Self {
            running: true,
            settings,
            quiz,
            leaderboard,
            clock,
            rng,
            theme: Theme::default(),
            next_questions: Some(questions),
            available,
            cursor: 0,
            notice: None,
            name_input: String::new(),
            save_status: SaveStatus::NotSaved,
            board: Vec::new(),
        }
    }

    pub fn quiz(&self) -> &QuizState {
        &self.quiz
    }

    /// Questions loaded for the next session, as announced on the welcome screen.
    pub fn available(&self) -> usize {
        self.available
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn save_status(&self) -> &SaveStatus {
        &self.save_status
    }

    pub fn board(&self) -> &[LeaderboardEntry] {
        &self.board
    }

    /// Waits up to `timeout` for a key, then advances the timer.
    pub fn handle_input(&mut self, timeout: Duration) -> std::io::Result<()> {
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                self.handle_key(key);
            }
        }
        Ok(())
    }

    pub fn on_tick(&mut self) {
        let signals = self.quiz.tick(self.clock.now());
        self.handle_signals(&signals);
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.running = false;
            return;
        }

        match self.quiz.phase() {
            Phase::NotStarted => match key.code {
                KeyCode::Enter => self.start(),
                KeyCode::Esc | KeyCode::Char('q') => self.running = false,
                _ => {}
            },
            Phase::InProgress(_) => match key.code {
                KeyCode::Up => self.move_cursor(-1),
                KeyCode::Down => self.move_cursor(1),
                KeyCode::Char(digit @ '1'..='4') => {
                    if let Some(number) = digit.to_digit(10) {
                        self.quiz.select(number as usize - 1);
                    }
                    if let Some(selected) = self.quiz.selected() {
                        self.cursor = selected;
                    }
                }
                KeyCode::Enter => {
                    self.quiz.select(self.cursor);
                    let signals = self.quiz.submit(self.clock.now());
                    self.handle_signals(&signals);
                }
                KeyCode::Esc => self.running = false,
                _ => {}
            },
            Phase::Answered(_) => match key.code {
                KeyCode::Enter | KeyCode::Right => {
                    let signals = self.quiz.advance(self.clock.now());
                    self.cursor = 0;
                    self.notice = None;
                    self.handle_signals(&signals);
                }
                KeyCode::Esc => self.running = false,
                _ => {}
            },
            Phase::Finished => self.handle_result_key(key.code),
        }
    }

    fn handle_result_key(&mut self, code: KeyCode) {
        let saved = matches!(self.save_status, SaveStatus::Saved { .. });
        match code {
            KeyCode::Esc => self.running = false,
            KeyCode::Char('r') if saved => self.start(),
            KeyCode::Char('q') if saved => self.running = false,
            KeyCode::Enter if !saved => self.save(),
            KeyCode::Backspace if !saved => {
                self.name_input.pop();
                self.refresh_name_status();
            }
            KeyCode::Char(c) if !saved => {
                self.name_input.push(c);
                self.refresh_name_status();
            }
            _ => {}
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let Some(question) = self.quiz.current_question() else {
            return;
        };
        let count = question.options().len() as isize;
        self.cursor = (self.cursor as isize + delta).rem_euclid(count) as usize;
        self.quiz.select(self.cursor);
    }

    fn start(&mut self) {
        let questions = match self.next_questions.take() {
            Some(questions) => questions,
            None => QuestionBank::load(&self.settings.questions_path, &mut self.rng),
        };

        match self.quiz.start(questions, self.clock.now()) {
            Ok(signals) => {
                self.cursor = 0;
                self.notice = None;
                self.name_input.clear();
                self.save_status = SaveStatus::NotSaved;
                self.handle_signals(&signals);
            }
            Err(error) => {
                log::error!("{error}");
                self.notice = Some(Notice::Error(error.to_string()));
            }
        }
    }

    fn refresh_name_status(&mut self) {
        self.save_status = match validate_name(&self.name_input) {
            Ok(_) => SaveStatus::NotSaved,
            Err(_) if self.name_input.is_empty() => SaveStatus::NotSaved,
            Err(error) => SaveStatus::Invalid(error.to_string()),
        };
    }

    fn save(&mut self) {
        let name = match validate_name(&self.name_input) {
            Ok(name) => name.to_string(),
            Err(error) => {
                self.save_status = SaveStatus::Invalid(error.to_string());
                return;
            }
        };

        let rank = self.quiz.rank().to_string();
        self.save_status = match self.leaderboard.append(&name, self.quiz.score(), &rank) {
            Ok(position) => SaveStatus::Saved { position },
            Err(error) => {
                log::error!("{error}");
                SaveStatus::Failed(error.to_string())
            }
        };
        self.board = self.leaderboard.read_sorted();
    }

    fn handle_signals(&mut self, signals: &[QuizSignal]) {
        for signal in signals {
            match signal {
                QuizSignal::FinalCountdown => self.notice = Some(Notice::Countdown),
                QuizSignal::TimeUp => {
                    self.cursor = 0;
                    self.notice = Some(Notice::TimeUp);
                }
                QuizSignal::WrongAnswer => {
                    let correct = self
                        .quiz
                        .current_question()
                        .map(|question| question.correct_option().to_string())
                        .unwrap_or_default();
                    self.notice = Some(Notice::Wrong { correct });
                }
                QuizSignal::Correct { points } => {
                    self.notice = Some(Notice::Correct { points: *points })
                }
                QuizSignal::Finished => {
                    if let Err(error) = self.leaderboard.ensure() {
                        log::warn!("{error}");
                    }
                    self.board = self.leaderboard.read_sorted();
                }
            }
        }
    }

    pub fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(Clear, area);

        match self.quiz.phase() {
            Phase::NotStarted => self.render_welcome(frame, area),
            Phase::InProgress(_) | Phase::Answered(_) => self.render_quiz(frame, area),
            Phase::Finished => self.render_result(frame, area),
        }
    }

    fn render_welcome(&self, frame: &mut Frame, area: Rect) {
        let mut text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Bienvenidos",
                Style::default()
                    .fg(self.theme.accent)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(format!(
                "Este quiz evalúa y refuerza conocimientos clave del proceso comercial. \
                 Responderás {} preguntas con {} segundos por pregunta.",
                self.available, self.settings.time_limit_secs
            )),
            Line::from("Sumás puntos por aciertos y podés compararte en el ranking."),
            Line::from(""),
            Line::from(Span::styled(
                "Enter para comenzar  ·  Esc para salir",
                Style::default().fg(self.theme.warning),
            )),
        ];
        if let Some(Notice::Error(message)) = &self.notice {
            text.push(Line::from(""));
            text.push(Line::from(Span::styled(
                message.clone(),
                Style::default().fg(self.theme.alert),
            )));
        }

        let welcome = Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(styled_block("Terraloteos", &self.theme));
        frame.render_widget(welcome, area);
    }

    fn render_quiz(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Header
                Constraint::Length(3), // Progress
                Constraint::Min(8),    // Question
                Constraint::Length(3), // Feedback
                Constraint::Length(1), // Help
            ])
            .split(area);

        self.render_header(frame, chunks[0]);

        let progress = self.quiz.progress_percent();
        let gauge = Gauge::default()
            .block(styled_block("Camino a la oficina", &self.theme))
            .gauge_style(Style::default().fg(self.theme.success))
            .percent(progress)
            .label(format!("Ayudá a Foxy a llegar a tiempo con el cliente: {}%", progress));
        frame.render_widget(gauge, chunks[1]);

        if let Some(question) = self.quiz.current_question() {
            self.render_question(frame, chunks[2], question);
        }

        self.render_notice(frame, chunks[3]);

        let help = if self.quiz.is_answered() {
            " Enter: siguiente  ·  Esc: salir "
        } else {
            " ↑/↓ o 1-4: elegir  ·  Enter: responder  ·  Esc: salir "
        };
        frame.render_widget(
            Paragraph::new(help).style(Style::default().fg(self.theme.fg).bg(Color::DarkGray)),
            chunks[4],
        );
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(40),
                Constraint::Percentage(30),
                Constraint::Percentage(30),
            ])
            .split(area);

        let counter = Paragraph::new(format!(
            "Preguntas: {}/{}",
            self.quiz.question_number(),
            self.quiz.total()
        ))
        .block(styled_block("Quiz", &self.theme));
        frame.render_widget(counter, columns[0]);

        let score = Paragraph::new(format!("Puntos: {}", self.quiz.score()))
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.border)),
            );
        frame.render_widget(score, columns[1]);

        let remaining = self.quiz.remaining_secs(self.clock.now());
        let timer_color = if self.quiz.is_answered() {
            self.theme.fg
        } else if remaining <= self.settings.final_warning_secs {
            self.theme.alert
        } else {
            self.theme.success
        };
        let timer = Paragraph::new(format!("Tiempo: {:02}s", remaining))
            .style(Style::default().fg(timer_color).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Right)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.border)),
            );
        frame.render_widget(timer, columns[2]);
    }

    fn render_question(&self, frame: &mut Frame, area: Rect, question: &Question) {
        let answered = self.quiz.is_answered();
        let items: Vec<ListItem> = question
            .options()
            .iter()
            .enumerate()
            .map(|(index, option)| {
                let highlighted = index == self.cursor;
                let marker = if highlighted { "▶ " } else { "  " };
                let style = if answered && question.is_correct(index) {
                    Style::default().fg(self.theme.success).add_modifier(Modifier::BOLD)
                } else if answered && self.quiz.selected() == Some(index) {
                    Style::default().fg(self.theme.alert)
                } else if highlighted {
                    Style::default().fg(self.theme.accent).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(self.theme.fg)
                };
                ListItem::new(Line::from(Span::styled(
                    format!("{}{}. {}", marker, index + 1, option),
                    style,
                )))
            })
            .collect();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(4)])
            .split(area);

        let prompt = Paragraph::new(question.text())
            .wrap(Wrap { trim: true })
            .style(Style::default().add_modifier(Modifier::BOLD))
            .block(styled_block("Pregunta", &self.theme));
        frame.render_widget(prompt, chunks[0]);

        let list = List::new(items).block(styled_block("Elegí una opción", &self.theme));
        frame.render_widget(list, chunks[1]);
    }

    fn render_notice(&self, frame: &mut Frame, area: Rect) {
        let (message, color) = match &self.notice {
            Some(Notice::Countdown) => ("¡Últimos segundos!".to_string(), self.theme.warning),
            Some(Notice::TimeUp) => (
                "Se acabó el tiempo de la pregunta anterior.".to_string(),
                self.theme.warning,
            ),
            Some(Notice::Wrong { correct }) => (
                format!("Respuesta incorrecta. La correcta era: {}", correct),
                self.theme.alert,
            ),
            Some(Notice::Correct { points }) => {
                (format!("Correcto. Sumaste {} puntos.", points), self.theme.success)
            }
            Some(Notice::Error(message)) => (message.clone(), self.theme.alert),
            None => (String::new(), self.theme.fg),
        };

        let notice = Paragraph::new(message)
            .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(self.theme.border)),
            );
        frame.render_widget(notice, area);
    }

    fn render_result(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(8), // Summary
                Constraint::Length(4), // Name input
                Constraint::Min(5),    // Leaderboard
                Constraint::Length(1), // Help
            ])
            .split(area);

        let rank = self.quiz.rank();
        let mut summary = vec![
            Line::from(vec![
                Span::raw("Puntaje: "),
                Span::styled(
                    self.quiz.score().to_string(),
                    Style::default().fg(self.theme.accent).add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(
                    " de {} posibles",
                    max_possible_score(self.quiz.total(), &self.settings)
                )),
            ]),
            Line::from(vec![
                Span::raw("Rango obtenido: "),
                Span::styled(
                    rank.to_string(),
                    Style::default().fg(self.theme.warning).add_modifier(Modifier::BOLD),
                ),
            ]),
            Line::from(""),
        ];
        if self.settings.ranks.is_top(rank) {
            summary.push(Line::from(Span::styled(
                "¡Felicitaciones! Llegaste a lo más alto.",
                Style::default().fg(self.theme.success),
            )));
        } else {
            summary.push(Line::from(format!(
                "Falta lectura del contenido. Material oficial: {}",
                STUDY_MATERIAL_URL
            )));
            summary.push(Line::from(Span::styled(
                "UN ASESOR SIN PREPARACIÓN ES UN ESPECTADOR... ¡Y VOS VINISTE A SER PROTAGONISTA!",
                Style::default().fg(self.theme.warning),
            )));
        }
        let summary = Paragraph::new(summary)
            .wrap(Wrap { trim: true })
            .block(styled_block("Resultado final", &self.theme));
        frame.render_widget(summary, chunks[0]);

        let (status, color) = match &self.save_status {
            SaveStatus::NotSaved => (
                "Escribí tu nombre y presioná Enter.".to_string(),
                self.theme.fg,
            ),
            SaveStatus::Invalid(reason) => (
                format!("Usá solo letras y espacios (2 a 40 caracteres): {}", reason),
                self.theme.alert,
            ),
            SaveStatus::Saved { position } => (
                format!("Puntaje guardado en el ranking, puesto #{}.", position),
                self.theme.success,
            ),
            SaveStatus::Failed(reason) => (
                format!("No se pudo guardar el ranking: {}", reason),
                self.theme.alert,
            ),
        };
        let input = Paragraph::new(vec![
            Line::from(format!("> {}", self.name_input)),
            Line::from(Span::styled(status, Style::default().fg(color))),
        ])
        .block(styled_block("Nombre para el ranking", &self.theme));
        frame.render_widget(input, chunks[1]);

        self.render_board(frame, chunks[2]);

        let help = match (&self.notice, &self.save_status) {
            (Some(Notice::Error(message)), _) => format!(" {} ", message),
            (_, SaveStatus::Saved { .. }) => " r: jugar de nuevo  ·  q/Esc: salir ".to_string(),
            _ => " Enter: guardar  ·  Esc: salir ".to_string(),
        };
        frame.render_widget(
            Paragraph::new(help).style(Style::default().fg(self.theme.fg).bg(Color::DarkGray)),
            chunks[3],
        );
    }

    fn render_board(&self, frame: &mut Frame, area: Rect) {
        if self.board.is_empty() {
            let empty = Paragraph::new("Aún no hay puntajes guardados.")
                .block(styled_block("Ranking", &self.theme));
            frame.render_widget(empty, area);
            return;
        }

        let rows = self.board.iter().enumerate().map(|(index, entry)| {
            let style = if index < TOP_HIGHLIGHT {
                Style::default().fg(self.theme.warning)
            } else {
                Style::default().fg(self.theme.fg)
            };
            Row::new(vec![
                Cell::from(format!("#{}", index + 1)),
                Cell::from(entry.name.clone()),
                Cell::from(entry.rank.clone()),
                Cell::from(entry.score.to_string()),
                Cell::from(entry.timestamp.clone()),
            ])
            .style(style)
        });

        let header = Row::new(vec!["#", "Nombre", "Rango", "Puntaje", "Información"])
            .style(Style::default().fg(self.theme.accent).add_modifier(Modifier::BOLD));
        let table = Table::new(
            rows,
            [
                Constraint::Length(5),
                Constraint::Percentage(35),
                Constraint::Percentage(20),
                Constraint::Length(8),
                Constraint::Min(19),
            ],
        )
        .header(header)
        .block(styled_block("Ranking", &self.theme));
        frame.render_widget(table, area);
    }
}
