use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::clock::{Clock, SystemClock, format_timestamp};
use crate::name::NAME_MAX_CHARS;

pub const LEADERBOARD_COLUMNS: [&str; 4] = ["name", "score", "rank", "timestamp"];

/// Number of rows the result screen highlights.
pub const TOP_HIGHLIGHT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: i64,
    pub rank: String,
    /// ISO-8601 local time, seconds precision. Sorts lexicographically.
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error)]
pub enum LeaderboardError {
    #[error("failed to access leaderboard at {path}: {source}")]
    Io { path: String, source: io::Error },
    #[error("failed to process leaderboard at {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

/// Best first: score descending, then earliest timestamp. Stable, so rows
/// equal on both keys keep their stored order.
pub fn sort_entries(entries: &mut [LeaderboardEntry]) {
    entries.sort_by(|left, right| {
        right
            .score
            .cmp(&left.score)
            .then_with(|| left.timestamp.cmp(&right.timestamp))
    });
}

/// CSV-backed, append-only score table shared by every session.
///
/// Each save rewrites the whole file through a uniquely named temporary
/// sibling and a rename, so readers see either the old or the new store.
/// There is no locking: two sessions saving at the same moment can still
/// drop one entry.
pub struct Leaderboard<C: Clock = SystemClock> {
    path: PathBuf,
    clock: C,
}

impl Leaderboard<SystemClock> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_clock(path, SystemClock)
    }
}

impl<C: Clock> Leaderboard<C> {
    pub fn with_clock(path: impl Into<PathBuf>, clock: C) -> Self {
        Self {
            path: path.into(),
            clock,
        }
    }

    /// Makes sure the store exists with every column, repairing it in place
    /// when columns are missing.
    pub fn ensure(&self) -> Result<(), LeaderboardError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
            }
        }

        if !self.path.exists() {
            log::info!("creating leaderboard at {}", self.path.display());
            return write_entries(&self.path, &[]);
        }

        let mut reader = match csv::ReaderBuilder::new().flexible(true).from_path(&self.path) {
            Ok(reader) => reader,
            Err(error) => {
                log::warn!("resetting unreadable leaderboard: {error}");
                return write_entries(&self.path, &[]);
            }
        };
        let columns = match reader.headers() {
            Ok(headers) => Columns::from_headers(headers),
            Err(error) => {
                log::warn!("resetting leaderboard with unreadable header: {error}");
                return write_entries(&self.path, &[]);
            }
        };

        if columns.is_complete() {
            return Ok(());
        }

        let entries = collect_entries(&mut reader, &columns);
        drop(reader);
        log::info!(
            "adding missing columns to leaderboard at {}",
            self.path.display()
        );
        write_entries(&self.path, &entries)
    }

    /// Entries in leaderboard order. Any read failure yields an empty board.
    pub fn read_sorted(&self) -> Vec<LeaderboardEntry> {
        match read_entries(&self.path) {
            Ok(mut entries) => {
                sort_entries(&mut entries);
                entries
            }
            Err(error) => {
                log::warn!("{error}");
                Vec::new()
            }
        }
    }

    /// Stores a result and returns its 1-based position on the board.
    ///
    /// The name is trimmed and cut to 40 characters but not otherwise
    /// validated; callers gate on [`crate::name::validate_name`] first.
    pub fn append(&self, name: &str, score: u32, rank: &str) -> Result<usize, LeaderboardError> {
        self.ensure()?;

        let mut entries = read_entries(&self.path).unwrap_or_else(|error| {
            log::warn!("{error}");
            Vec::new()
        });

        let entry = LeaderboardEntry {
            name: name.trim().chars().take(NAME_MAX_CHARS).collect(),
            score: i64::from(score),
            rank: rank.to_string(),
            timestamp: format_timestamp(&self.clock.now()),
        };
        entries.push(entry.clone());
        sort_entries(&mut entries);

        write_entries(&self.path, &entries)?;

        let position = entries
            .iter()
            .rposition(|stored| stored == &entry)
            .map(|index| index + 1)
            .unwrap_or(entries.len());
        log::info!(
            "saved {} with {} points at position {}",
            entry.name,
            entry.score,
            position
        );
        Ok(position)
    }

    fn io_error(&self, source: io::Error) -> LeaderboardError {
        LeaderboardError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[derive(Debug)]
struct Columns {
    name: Option<usize>,
    score: Option<usize>,
    rank: Option<usize>,
    timestamp: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let find = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim_start_matches('\u{feff}').trim() == name)
        };

        Self {
            name: find("name"),
            score: find("score"),
            rank: find("rank"),
            timestamp: find("timestamp"),
        }
    }

    fn is_complete(&self) -> bool {
        self.name.is_some()
            && self.score.is_some()
            && self.rank.is_some()
            && self.timestamp.is_some()
    }
}

fn text(record: &csv::StringRecord, column: Option<usize>) -> String {
    column
        .and_then(|index| record.get(index))
        .unwrap_or("")
        .to_string()
}

/// Integer cells, tolerating `"80.0"`. Anything else counts as zero.
fn parse_score(raw: &str) -> i64 {
    let raw = raw.trim();
    if let Ok(score) = raw.parse::<i64>() {
        return score;
    }

    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => value.trunc() as i64,
        _ => 0,
    }
}

fn collect_entries<R: io::Read>(
    reader: &mut csv::Reader<R>,
    columns: &Columns,
) -> Vec<LeaderboardEntry> {
    reader
        .records()
        .filter_map(|record| match record {
            Ok(record) => Some(record),
            Err(error) => {
                log::debug!("skipping undecodable leaderboard row: {error}");
                None
            }
        })
        .map(|record| LeaderboardEntry {
            name: text(&record, columns.name),
            score: parse_score(&text(&record, columns.score)),
            rank: text(&record, columns.rank),
            timestamp: text(&record, columns.timestamp),
        })
        .collect()
}

fn read_entries(path: &Path) -> Result<Vec<LeaderboardEntry>, LeaderboardError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|source| LeaderboardError::Csv {
            path: path.display().to_string(),
            source,
        })?;

    let columns = Columns::from_headers(reader.headers().map_err(|source| {
        LeaderboardError::Csv {
            path: path.display().to_string(),
            source,
        }
    })?);

    Ok(collect_entries(&mut reader, &columns))
}

fn write_entries(path: &Path, entries: &[LeaderboardEntry]) -> Result<(), LeaderboardError> {
    let csv_error = |source| LeaderboardError::Csv {
        path: path.display().to_string(),
        source,
    };
    let io_error = |source| LeaderboardError::Io {
        path: path.display().to_string(),
        source,
    };

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staging = tempfile::NamedTempFile::new_in(parent).map_err(io_error)?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(staging.as_file_mut());
    writer.write_record(LEADERBOARD_COLUMNS).map_err(csv_error)?;
    for entry in entries {
        writer.serialize(entry).map_err(csv_error)?;
    }
    writer.flush().map_err(io_error)?;
    drop(writer);

    staging
        .persist(path)
        .map(|_| ())
        .map_err(|error| io_error(error.error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_cells_are_lenient() {
        assert_eq!(parse_score("80"), 80);
        assert_eq!(parse_score(" 80.0 "), 80);
        assert_eq!(parse_score(""), 0);
        assert_eq!(parse_score("mucho"), 0);
    }

    #[test]
    fn sorting_is_score_then_time() {
        let entry = |name: &str, score: i64, timestamp: &str| LeaderboardEntry {
            name: name.to_string(),
            score,
            rank: String::new(),
            timestamp: timestamp.to_string(),
        };
        let mut entries = vec![
            entry("late", 50, "2024-01-01T10:00:05"),
            entry("top", 80, "2024-01-01T10:00:09"),
            entry("early", 50, "2024-01-01T10:00:01"),
        ];

        sort_entries(&mut entries);

        let names: Vec<&str> = entries.iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(names, vec!["top", "early", "late"]);
    }

    #[test]
    fn ensure_creates_header_only_store() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = dir.path().join("data").join("leaderboard.csv");
        let board = Leaderboard::new(&path);

        board.ensure().expect("store should be created");

        let contents = fs::read_to_string(&path).expect("store should exist");
        assert_eq!(contents, "name,score,rank,timestamp\n");
        assert!(board.read_sorted().is_empty());
    }

    #[test]
    fn ensure_adds_missing_columns() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = dir.path().join("leaderboard.csv");
        fs::write(&path, "name,score,timestamp\nAna,40,2024-01-01T10:00:00\n")
            .expect("store should be written");

        Leaderboard::new(&path).ensure().expect("store should be repaired");

        let contents = fs::read_to_string(&path).expect("store should exist");
        assert_eq!(
            contents,
            "name,score,rank,timestamp\nAna,40,,2024-01-01T10:00:00\n"
        );
    }

    #[test]
    fn ensure_leaves_complete_store_alone() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");
        let path = dir.path().join("leaderboard.csv");
        let original = "timestamp,rank,score,name\n2024-01-01T10:00:00,Asesor Jr.,40,Ana\n";
        fs::write(&path, original).expect("store should be written");

        Leaderboard::new(&path).ensure().expect("store is fine");

        assert_eq!(fs::read_to_string(&path).expect("store should exist"), original);
    }

    #[test]
    fn missing_store_reads_as_empty() {
        let dir = tempfile::tempdir().expect("temporary directory should be created");

        let board = Leaderboard::new(dir.path().join("absent.csv"));

        assert!(board.read_sorted().is_empty());
    }
}
