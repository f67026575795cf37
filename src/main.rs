use std::io::{self, Stdout, stdout};
use std::process::ExitCode;

use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use rand::SeedableRng;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use terraquiz::config::{CONFIG_ENV_VAR, DEFAULT_CONFIG_PATH};
use terraquiz::tui::{App, TICK_RATE};
use terraquiz::{QuestionBank, Settings};

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
) -> io::Result<()> {
    while app.running {
        terminal.draw(|frame| app.render(frame))?;
        app.handle_input(TICK_RATE)?;
        app.on_tick();
    }
    Ok(())
}

fn run(app: &mut App) -> io::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = event_loop(&mut terminal, app);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    outcome
}

fn main() -> ExitCode {
    pretty_env_logger::init();

    let config_path =
        std::env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let settings = match Settings::load_or_default(&config_path) {
        Ok(settings) => settings,
        Err(error) => {
            eprintln!("{error}");
            return ExitCode::FAILURE;
        }
    };

    let mut rng = rand::rngs::StdRng::from_entropy();
    let questions = QuestionBank::load(&settings.questions_path, &mut rng);
    if questions.is_empty() {
        eprintln!(
            "No hay preguntas cargadas en {}",
            settings.questions_path.display()
        );
        return ExitCode::FAILURE;
    }

    let mut app = App::new(settings, questions);
    if let Err(error) = run(&mut app) {
        eprintln!("{error}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
