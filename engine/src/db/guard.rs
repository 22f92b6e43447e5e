//! Read-only SQL guard
//!
//! Every statement the SQL agent produces passes through [`SqlGuard::validate`]
//! before it reaches SQLite. Only a single `SELECT` or `WITH` statement is
//! accepted. Keywords inside string literals, quoted identifiers and comments
//! are ignored, so `WHERE note = 'delete me'` is fine.
//!
//! The connection is also opened read-only; the guard exists so the agent gets
//! a clear message it can act on instead of a driver error.

use sdk::errors::EngineError;

/// Keywords that modify data, schema or connection state
const FORBIDDEN_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "TRUNCATE", "ATTACH", "DETACH",
    "PRAGMA", "VACUUM", "REINDEX", "GRANT", "REVOKE", "UPSERT",
];

/// Forbidden only as a statement keyword; `REPLACE(x, y, z)` is a scalar function
const REPLACE: &str = "REPLACE";

/// A bare word and whether the next non-blank character is `(`
struct Word {
    text: String,
    called: bool,
}

impl Word {
    fn is_forbidden(&self) -> bool {
        FORBIDDEN_KEYWORDS.contains(&self.text.as_str()) || (self.text == REPLACE && !self.called)
    }
}

/// Validates agent-issued SQL
pub struct SqlGuard;

impl SqlGuard {
    /// Accept a single read-only statement, or explain why not.
    pub fn validate(sql: &str) -> Result<(), EngineError> {
        let code = strip_literals_and_comments(sql);
        let statement = code.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace());

        if statement.is_empty() {
            return Err(EngineError::WriteQueryNotAllowed(
                "empty statement".to_string(),
            ));
        }

        if statement.contains(';') {
            return Err(EngineError::WriteQueryNotAllowed(
                "multiple statements are not allowed".to_string(),
            ));
        }

        let mut words = words(statement).into_iter();

        match words.next().map(|w| w.text).as_deref() {
            Some("SELECT") | Some("WITH") => {}
            Some(other) => {
                return Err(EngineError::WriteQueryNotAllowed(format!(
                    "statements starting with {} are not allowed",
                    other
                )));
            }
            None => {
                return Err(EngineError::WriteQueryNotAllowed(
                    "empty statement".to_string(),
                ));
            }
        }

        if let Some(keyword) = words.find(Word::is_forbidden) {
            return Err(EngineError::WriteQueryNotAllowed(format!(
                "{} is not allowed in a read-only query",
                keyword.text
            )));
        }

        Ok(())
    }
}

/// Uppercased identifier-like words in order of appearance.
fn words(code: &str) -> Vec<Word> {
    let is_word_char = |c: char| c.is_ascii_alphanumeric() || c == '_';
    let mut out = Vec::new();
    let mut rest = code;

    while let Some(start) = rest.find(is_word_char) {
        let tail = &rest[start..];
        let end = tail.find(|c: char| !is_word_char(c)).unwrap_or(tail.len());
        let after = tail[end..].trim_start();
        out.push(Word {
            text: tail[..end].to_ascii_uppercase(),
            called: after.starts_with('('),
        });
        rest = &tail[end..];
    }

    out
}

/// Replace quoted regions with spaces and drop comments.
///
/// Handles '...', "...", `...` and [...] with doubled-quote escapes, plus
/// `--` line comments and `/* */` block comments.
fn strip_literals_and_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' | '[' => {
                let close = if c == '[' { ']' } else { c };
                out.push(' ');
                while let Some(inner) = chars.next() {
                    if inner == close {
                        if close != ']' && chars.peek() == Some(&close) {
                            chars.next();
                            continue;
                        }
                        break;
                    }
                }
                out.push(' ');
            }
            '-' if chars.peek() == Some(&'-') => {
                for inner in chars.by_ref() {
                    if inner == '\n' {
                        break;
                    }
                }
                out.push('\n');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for inner in chars.by_ref() {
                    if prev == '*' && inner == '/' {
                        break;
                    }
                    prev = inner;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_select_and_with() {
        assert!(SqlGuard::validate("SELECT * FROM PlayerStats LIMIT 5").is_ok());
        assert!(SqlGuard::validate("  select name from Players;  ").is_ok());
        assert!(SqlGuard::validate(
            "WITH totals AS (SELECT team, SUM(points) p FROM Games GROUP BY team) SELECT * FROM totals"
        )
        .is_ok());
    }

    #[test]
    fn test_rejects_writes() {
        for sql in [
            "DELETE FROM PlayerStats",
            "UPDATE Players SET name = 'x'",
            "DROP TABLE Games",
            "INSERT INTO Games VALUES (1)",
            "PRAGMA writable_schema = 1",
            "ATTACH DATABASE 'x.db' AS x",
        ] {
            assert!(
                matches!(SqlGuard::validate(sql), Err(EngineError::WriteQueryNotAllowed(_))),
                "{} should be rejected",
                sql
            );
        }
    }

    #[test]
    fn test_rejects_smuggled_statements() {
        assert!(SqlGuard::validate("SELECT 1; DROP TABLE Games").is_err());
        assert!(SqlGuard::validate("WITH x AS (DELETE FROM Games RETURNING *) SELECT * FROM x").is_err());
    }

    #[test]
    fn test_keywords_inside_literals_are_ignored() {
        assert!(SqlGuard::validate("SELECT * FROM Games WHERE note = 'update; drop'").is_ok());
        assert!(SqlGuard::validate(r#"SELECT "Delete" FROM Weird"#).is_ok());
        assert!(SqlGuard::validate("SELECT 'it''s; fine' AS q").is_ok());
        assert!(SqlGuard::validate("SELECT 1 -- drop everything;\n").is_ok());
        assert!(SqlGuard::validate("SELECT /* delete; */ 1").is_ok());
    }

    #[test]
    fn test_column_names_containing_keywords_are_fine() {
        assert!(SqlGuard::validate("SELECT created_at, last_update FROM Games").is_ok());
    }

    #[test]
    fn test_replace_function_is_allowed() {
        assert!(SqlGuard::validate("SELECT REPLACE(player, '.', '') FROM PlayerStats").is_ok());
        assert!(SqlGuard::validate("SELECT replace (team, 'UC ', '') AS short FROM TeamStats").is_ok());
    }

    #[test]
    fn test_replace_statement_is_rejected() {
        for sql in [
            "REPLACE INTO PlayerStats VALUES (1)",
            "WITH x AS (SELECT 1) REPLACE INTO PlayerStats VALUES (1)",
            "INSERT OR REPLACE INTO PlayerStats VALUES (1)",
        ] {
            assert!(
                matches!(SqlGuard::validate(sql), Err(EngineError::WriteQueryNotAllowed(_))),
                "{} should be rejected",
                sql
            );
        }
    }

    #[test]
    fn test_rejects_empty() {
        assert!(SqlGuard::validate("").is_err());
        assert!(SqlGuard::validate(" ; ").is_err());
        assert!(SqlGuard::validate("-- just a comment").is_err());
    }
}
