//! Line classification: decides whether a candidate line is skipped, executed,
//! or needs more bytes before it forms a complete statement.
//!
//! Only statement boundaries and single-line comments are recognized. There is
//! no SQL parsing: a statement is complete when its last physical line ends
//! with the terminator byte.

/// Byte that ends a statement on its final physical line.
pub const TERMINATOR: u8 = b';';

/// What to do with a candidate line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// Blank line or comment: consume and checkpoint without executing.
    Skip,
    /// Complete statement: execute, then consume and checkpoint.
    Execute,
    /// Statement continues on a later line: keep the bytes and scan further.
    Incomplete,
}

/// Decides how a candidate line is handled.
///
/// Implementations must be pure: the same bytes always produce the same class.
pub trait Classifier {
    fn classify(&self, line: &[u8]) -> LineClass;
}

/// SQL dialect, which selects the single-line comment grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SqlDialect {
    /// `#`, `-- ` and a bare `--`.
    #[default]
    MySql,
    /// Any line starting with `--`.
    Postgres,
    /// Any line starting with `--`.
    Sqlite,
}

impl std::str::FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(SqlDialect::MySql),
            "postgres" | "postgresql" | "pg" => Ok(SqlDialect::Postgres),
            "sqlite" | "sqlite3" => Ok(SqlDialect::Sqlite),
            _ => Err(format!(
                "Unknown dialect: {}. Valid options: mysql, postgres, sqlite",
                s
            )),
        }
    }
}

impl std::fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlDialect::MySql => write!(f, "mysql"),
            SqlDialect::Postgres => write!(f, "postgres"),
            SqlDialect::Sqlite => write!(f, "sqlite"),
        }
    }
}

impl SqlDialect {
    /// Returns true if the line is a single-line comment in this dialect.
    #[inline]
    pub fn is_comment(&self, line: &[u8]) -> bool {
        match self {
            // https://dev.mysql.com/doc/refman/8.0/en/comments.html
            SqlDialect::MySql => {
                line == b"--" || line.starts_with(b"-- ") || line.starts_with(b"#")
            }
            SqlDialect::Postgres | SqlDialect::Sqlite => line.starts_with(b"--"),
        }
    }
}

impl Classifier for SqlDialect {
    #[inline]
    fn classify(&self, line: &[u8]) -> LineClass {
        if line.is_empty() || self.is_comment(line) {
            return LineClass::Skip;
        }

        if line.last() == Some(&TERMINATOR) {
            LineClass::Execute
        } else {
            LineClass::Incomplete
        }
    }
}

/// Strips the trailing terminator from an executable line.
#[inline]
pub fn strip_terminator(line: &[u8]) -> &[u8] {
    line.strip_suffix(&[TERMINATOR]).unwrap_or(line)
}
