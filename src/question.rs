use std::fs;
use std::io;
use std::path::Path;

use rand::Rng;
use rand::seq::SliceRandom;

pub const MIN_OPTIONS: usize = 2;
pub const MAX_OPTIONS: usize = 4;

/// Keywords that mark a question as company/onboarding material.
pub const INSTITUTIONAL_KEYWORDS: [&str; 12] = [
    "terraloteos",
    "terra",
    "institucional",
    "misión",
    "vision",
    "visión",
    "valores",
    "empresa",
    "oficinas",
    "beneficios",
    "plusvalía",
    "rentabilidad",
];

/// A multiple-choice question whose answer index always points into its options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    text: String,
    options: Vec<String>,
    correct_index: usize,
    category: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QuestionError {
    #[error("question text must not be empty")]
    EmptyText,
    #[error("a question needs between 2 and 4 options, got {found}")]
    OptionCount { found: usize },
    #[error("answer index {index} is out of range for {options} options")]
    AnswerOutOfRange { index: usize, options: usize },
}

impl Question {
    pub fn new(
        text: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
        category: Option<String>,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }

        if !(MIN_OPTIONS..=MAX_OPTIONS).contains(&options.len()) {
            return Err(QuestionError::OptionCount {
                found: options.len(),
            });
        }

        if correct_index >= options.len() {
            return Err(QuestionError::AnswerOutOfRange {
                index: correct_index,
                options: options.len(),
            });
        }

        Ok(Self {
            text,
            options,
            correct_index,
            category,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_index(&self) -> usize {
        self.correct_index
    }

    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_index]
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_index
    }

    /// Onboarding questions are tagged with an `inst*` category or mention
    /// one of [`INSTITUTIONAL_KEYWORDS`].
    pub fn is_institutional(&self) -> bool {
        let tagged = self
            .category
            .as_deref()
            .map(|category| category.trim().to_lowercase().starts_with("inst"))
            .unwrap_or(false);
        if tagged {
            return true;
        }

        let text = self.text.to_lowercase();
        INSTITUTIONAL_KEYWORDS
            .iter()
            .any(|keyword| text.contains(keyword))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QuestionBankError {
    #[error("failed to read question file at {path}: {source}")]
    Read { path: String, source: io::Error },
    #[error("failed to parse question file at {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

/// Positions of the interesting columns in the question file header.
#[derive(Debug, Default)]
struct Columns {
    question: Option<usize>,
    options: [Option<usize>; MAX_OPTIONS],
    answer_index: Option<usize>,
    category: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let find = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim_start_matches('\u{feff}').trim() == name)
        };

        let mut options = [None; MAX_OPTIONS];
        for (slot, column) in options.iter_mut().enumerate() {
            *column = find(&format!("option{}", slot + 1));
        }

        Self {
            question: find("question"),
            options,
            answer_index: find("answer_index"),
            category: find("category").or_else(|| find("categoria")),
        }
    }
}

fn cell(record: &csv::StringRecord, column: Option<usize>) -> Option<&str> {
    column
        .and_then(|index| record.get(index))
        .filter(|value| !value.trim().is_empty())
}

/// Accepts `"2"` as well as spreadsheet-style `"2.0"`, truncating toward zero.
fn parse_answer_index(raw: &str) -> Option<usize> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() {
        return None;
    }

    let truncated = value.trunc();
    if truncated < 0.0 {
        return None;
    }
    Some(truncated as usize)
}

fn question_from_record(record: &csv::StringRecord, columns: &Columns) -> Option<Question> {
    let text = cell(record, columns.question)?;

    let options: Vec<String> = columns
        .options
        .iter()
        .filter_map(|column| cell(record, *column))
        .map(str::to_string)
        .collect();

    let correct_index = parse_answer_index(cell(record, columns.answer_index)?)?;
    let category = cell(record, columns.category).map(str::to_string);

    Question::new(text, options, correct_index, category).ok()
}

/// Loader for the question CSV.
pub struct QuestionBank;

impl QuestionBank {
    /// Loads and orders the question set, absorbing every failure into an
    /// empty list. Callers decide whether zero questions is fatal.
    pub fn load<R: Rng + ?Sized>(path: impl AsRef<Path>, rng: &mut R) -> Vec<Question> {
        let path = path.as_ref();
        match Self::try_load(path, rng) {
            Ok(questions) => {
                log::info!("loaded {} questions from {}", questions.len(), path.display());
                questions
            }
            Err(error) => {
                log::warn!("{error}");
                Vec::new()
            }
        }
    }

    pub fn try_load<R: Rng + ?Sized>(
        path: &Path,
        rng: &mut R,
    ) -> Result<Vec<Question>, QuestionBankError> {
        let file = fs::File::open(path).map_err(|source| QuestionBankError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::load_from_reader(file, rng).map_err(|source| QuestionBankError::Csv {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn load_from_reader<T: io::Read, R: Rng + ?Sized>(
        reader: T,
        rng: &mut R,
    ) -> Result<Vec<Question>, csv::Error> {
        let questions = parse_questions(reader)?;
        Ok(order_questions(questions, rng))
    }

    /// Number of rows with a question text, before any other validation.
    pub fn count_questions(path: impl AsRef<Path>) -> usize {
        let Ok(file) = fs::File::open(path.as_ref()) else {
            return 0;
        };

        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
        let columns = match reader.headers() {
            Ok(headers) => Columns::from_headers(headers),
            Err(_) => return 0,
        };

        reader
            .records()
            .filter_map(Result::ok)
            .filter(|record| cell(record, columns.question).is_some())
            .count()
    }
}

/// Parses rows in file order. Rows that cannot be decoded or fail validation
/// are skipped; only an unreadable header is an error.
pub fn parse_questions<T: io::Read>(reader: T) -> Result<Vec<Question>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns = Columns::from_headers(reader.headers()?);

    let mut questions = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(error) => {
                log::debug!("skipping undecodable question row {}: {error}", row + 1);
                continue;
            }
        };

        match question_from_record(&record, &columns) {
            Some(question) => questions.push(question),
            None => log::debug!("skipping malformed question row {}", row + 1),
        }
    }

    Ok(questions)
}

/// Institutional questions first, each group shuffled on its own.
pub fn order_questions<R: Rng + ?Sized>(questions: Vec<Question>, rng: &mut R) -> Vec<Question> {
    let (mut institutional, mut other): (Vec<_>, Vec<_>) = questions
        .into_iter()
        .partition(Question::is_institutional);

    institutional.shuffle(rng);
    other.shuffle(rng);

    institutional.extend(other);
    institutional
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn options(labels: &[&str]) -> Vec<String> {
        labels.iter().map(|label| label.to_string()).collect()
    }

    #[test]
    fn constructor_rejects_out_of_range_answer() {
        let error = Question::new("2 + 2?", options(&["3", "4"]), 2, None)
            .expect_err("answer index must be in range");

        assert_eq!(
            error,
            QuestionError::AnswerOutOfRange {
                index: 2,
                options: 2
            }
        );
    }

    #[test]
    fn constructor_rejects_single_option() {
        let error = Question::new("Only one?", options(&["yes"]), 0, None)
            .expect_err("one option is not a choice");

        assert_eq!(error, QuestionError::OptionCount { found: 1 });
    }

    #[test]
    fn institutional_by_category_prefix() {
        let question = Question::new(
            "¿Cuántos lotes hay?",
            options(&["10", "20"]),
            0,
            Some("  Institucional ".to_string()),
        )
        .expect("question is valid");

        assert!(question.is_institutional());
    }

    #[test]
    fn institutional_by_keyword() {
        let question = Question::new(
            "¿Cuál es la MISIÓN de la compañía?",
            options(&["a", "b"]),
            1,
            Some("ventas".to_string()),
        )
        .expect("question is valid");

        assert!(question.is_institutional());
    }

    #[test]
    fn other_questions_are_not_institutional() {
        let question = Question::new("¿Qué es un boleto?", options(&["a", "b"]), 0, None)
            .expect("question is valid");

        assert!(!question.is_institutional());
    }

    #[test]
    fn parses_rows_and_skips_malformed_ones() {
        let csv = "\
question,option1,option2,option3,option4,answer_index,category
Capital de Francia,París,Roma,,,0,general
Sin opciones,,,,,0,general
Indice fuera,a,b,c,,3,general
Indice decimal,a,b,c,d,2.0,general
,a,b,,,0,general
Indice raro,a,b,,,dos,general
Corta,a,b
";
        let questions = parse_questions(csv.as_bytes()).expect("header is readable");

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].text(), "Capital de Francia");
        assert_eq!(questions[0].options(), &["París", "Roma"]);
        assert_eq!(questions[0].category(), Some("general"));
        assert_eq!(questions[1].text(), "Indice decimal");
        assert_eq!(questions[1].correct_index(), 2);
        assert_eq!(questions[1].correct_option(), "c");
    }

    #[test]
    fn options_skip_blank_cells_in_column_order() {
        let csv = "\
question,option1,option2,option3,option4,answer_index
Huecos,,b,,d,1
";
        let questions = parse_questions(csv.as_bytes()).expect("header is readable");

        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].options(), &["b", "d"]);
        assert_eq!(questions[0].correct_option(), "d");
    }

    #[test]
    fn reads_spanish_category_column() {
        let csv = "\
question,option1,option2,answer_index,categoria
Pregunta,a,b,1,institucional
";
        let questions = parse_questions(csv.as_bytes()).expect("header is readable");

        assert_eq!(questions[0].category(), Some("institucional"));
        assert!(questions[0].is_institutional());
    }

    #[test]
    fn answer_index_parsing() {
        assert_eq!(parse_answer_index("2"), Some(2));
        assert_eq!(parse_answer_index(" 1.0 "), Some(1));
        assert_eq!(parse_answer_index("1.9"), Some(1));
        assert_eq!(parse_answer_index("-1"), None);
        assert_eq!(parse_answer_index("NaN"), None);
        assert_eq!(parse_answer_index("x"), None);
    }

    #[test]
    fn institutional_questions_come_first() {
        let mut questions = Vec::new();
        for n in 0..6 {
            questions.push(
                Question::new(format!("General {n}"), options(&["a", "b"]), 0, None)
                    .expect("question is valid"),
            );
        }
        for n in 0..4 {
            questions.push(
                Question::new(
                    format!("Valores de la empresa {n}"),
                    options(&["a", "b"]),
                    1,
                    None,
                )
                .expect("question is valid"),
            );
        }

        let mut rng = StdRng::seed_from_u64(42);
        let ordered = order_questions(questions.clone(), &mut rng);

        assert_eq!(ordered.len(), questions.len());
        assert!(ordered[..4].iter().all(Question::is_institutional));
        assert!(ordered[4..].iter().all(|q| !q.is_institutional()));
        for question in &questions {
            assert!(ordered.contains(question));
        }
    }

    #[test]
    fn missing_file_loads_nothing() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");
        let mut rng = StdRng::seed_from_u64(1);

        let questions = QuestionBank::load(dir.path().join("preguntas.csv"), &mut rng);

        assert!(questions.is_empty());
        assert_eq!(QuestionBank::count_questions(dir.path().join("preguntas.csv")), 0);
    }

    #[test]
    fn empty_file_loads_nothing() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = dir.path().join("preguntas.csv");
        fs::write(&path, "").expect("file should be written");
        let mut rng = StdRng::seed_from_u64(1);

        assert!(QuestionBank::load(&path, &mut rng).is_empty());
    }

    #[test]
    fn count_includes_rows_that_fail_validation() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = dir.path().join("preguntas.csv");
        fs::write(
            &path,
            "question,option1,option2,answer_index\nUna,a,b,0\nDos,a,b,9\n,a,b,0\n",
        )
        .expect("file should be written");

        assert_eq!(QuestionBank::count_questions(&path), 2);
    }
}
