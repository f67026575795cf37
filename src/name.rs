pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 40;

const ACCENTED_LETTERS: &str = "ÁÉÍÓÚÜÑáéíóúüñ";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NameError {
    #[error("name must not be empty")]
    Empty,
    #[error("name must be at least {min} characters long")]
    TooShort { min: usize },
    #[error("name must be at most {max} characters long")]
    TooLong { max: usize },
    #[error("only letters and spaces are allowed, found {0:?}")]
    InvalidCharacter(char),
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == ' ' || ACCENTED_LETTERS.contains(c)
}

/// Checks a leaderboard name and returns it trimmed.
pub fn validate_name(name: &str) -> Result<&str, NameError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(NameError::Empty);
    }

    if let Some(bad) = trimmed.chars().find(|c| !is_name_char(*c)) {
        return Err(NameError::InvalidCharacter(bad));
    }

    let length = trimmed.chars().count();
    if length < NAME_MIN_CHARS {
        return Err(NameError::TooShort {
            min: NAME_MIN_CHARS,
        });
    }
    if length > NAME_MAX_CHARS {
        return Err(NameError::TooLong {
            max: NAME_MAX_CHARS,
        });
    }

    Ok(trimmed)
}

pub fn is_valid_name(name: &str) -> bool {
    validate_name(name).is_ok()
}
