//! Lightweight statement scanning for migration scripts.
//!
//! Not a SQL parser: it only knows enough about quotes and comments to find
//! where each statement starts.

/// Leading keywords that open or close a transaction.
const TRANSACTION_KEYWORDS: &[&str] = &["BEGIN", "COMMIT", "ROLLBACK", "ABORT", "END"];

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment,
}

/// Split `sql` into statements with comments dropped and quoted text blanked.
///
/// Statements are separated by `;` outside quotes and comments. Empty
/// statements are omitted.
pub fn statement_heads(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut state = State::Code;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '\'' => {
                    state = State::SingleQuoted;
                    current.push_str("''");
                }
                '"' => {
                    state = State::DoubleQuoted;
                    current.push_str("\"\"");
                }
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    state = State::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = State::BlockComment;
                    current.push(' ');
                }
                ';' => push_statement(&mut statements, &mut current),
                _ => current.push(c),
            },
            State::SingleQuoted if c == '\'' => state = State::Code,
            State::DoubleQuoted if c == '"' => state = State::Code,
            State::LineComment if c == '\n' => {
                state = State::Code;
                current.push('\n');
            }
            State::BlockComment if c == '*' && chars.peek() == Some(&'/') => {
                chars.next();
                state = State::Code;
            }
            _ => {}
        }
    }
    push_statement(&mut statements, &mut current);
    statements
}

fn push_statement(statements: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
    current.clear();
}

/// First statement in `sql` that begins, commits, or rolls back a
/// transaction, normalized to upper case (e.g. `"COMMIT"`,
/// `"START TRANSACTION"`).
pub fn transaction_control_statement(sql: &str) -> Option<String> {
    statement_heads(sql).into_iter().find_map(|statement| {
        let mut words = statement.split_whitespace().map(str::to_ascii_uppercase);
        let first = words.next()?;
        if TRANSACTION_KEYWORDS.contains(&first.as_str()) {
            return Some(first);
        }
        match (first.as_str(), words.next().as_deref()) {
            ("START", Some("TRANSACTION")) => Some("START TRANSACTION".to_string()),
            _ => None,
        }
    })
}

#[cfg(test)]
#[path = "statements_test.rs"]
mod tests;
