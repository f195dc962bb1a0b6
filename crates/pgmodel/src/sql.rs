//! SQL text helpers shared by the query builder and the statement runner.

use regex::Regex;
use std::sync::OnceLock;

/// Rewrite `?` placeholders into PostgreSQL's numbered `$1, $2, ...` form.
///
/// Question marks inside single-quoted literals, double-quoted identifiers and
/// comments are left alone.
pub fn number_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut next = 1usize;
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '?' => {
                out.push('$');
                out.push_str(&next.to_string());
                next += 1;
            }
            '\'' | '"' => {
                out.push(ch);
                // Doubled quotes are escapes and simply re-enter the literal.
                for inner in chars.by_ref() {
                    out.push(inner);
                    if inner == ch {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                out.push(ch);
                for inner in chars.by_ref() {
                    out.push(inner);
                    if inner == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                out.push(ch);
                let mut prev = '\0';
                for inner in chars.by_ref() {
                    out.push(inner);
                    if prev == '*' && inner == '/' {
                        break;
                    }
                    prev = inner;
                }
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Whether `clause` contains the word `join` (any case) on word boundaries.
pub fn contains_join_keyword(clause: &str) -> bool {
    static JOIN_WORD: OnceLock<Regex> = OnceLock::new();
    JOIN_WORD
        .get_or_init(|| Regex::new(r"(?i)\bjoin\b").expect("valid join regex"))
        .is_match(clause)
}

/// Truncate SQL for logging without splitting a UTF-8 character.
pub(crate) fn truncate_for_log(sql: &str, max: Option<usize>) -> String {
    match max {
        Some(max) if sql.len() > max => {
            let mut end = max;
            while !sql.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &sql[..end])
        }
        _ => sql.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_placeholders_in_order() {
        assert_eq!(
            number_placeholders("UPDATE t SET a=?,b=? WHERE id = ?"),
            "UPDATE t SET a=$1,b=$2 WHERE id = $3"
        );
    }

    #[test]
    fn skips_quoted_text_and_comments() {
        assert_eq!(
            number_placeholders("SELECT '?', \"a?\" FROM t WHERE x = ? -- why?\nAND y = ?"),
            "SELECT '?', \"a?\" FROM t WHERE x = $1 -- why?\nAND y = $2"
        );
        assert_eq!(
            number_placeholders("SELECT 'it''s ?' /* ? */ , ?"),
            "SELECT 'it''s ?' /* ? */ , $1"
        );
    }

    #[test]
    fn join_keyword_is_whole_word() {
        assert!(contains_join_keyword("left JOIN companies on x"));
        assert!(contains_join_keyword("join companies"));
        assert!(!contains_join_keyword("companies on companies.id = joined.id"));
        assert!(!contains_join_keyword("rejoin"));
    }

    #[test]
    fn truncates_on_char_boundary() {
        assert_eq!(truncate_for_log("SELECT 1", Some(3)), "SEL...");
        assert_eq!(truncate_for_log("héllo", Some(2)), "h...");
        assert_eq!(truncate_for_log("SELECT 1", None), "SELECT 1");
    }
}
