// Query text handling: placeholders, parameter binding, pagination
//
// Placeholders are recognised outside string literals, quoted identifiers
// and comments:
//   ?      next ordinal (highest ordinal seen so far + 1)
//   ?N     ordinal N (1-based)
//   :name  named parameter (`::` is a cast, not a parameter)
// Every placeholder is rewritten to a bare `?` bound in order of appearance.

use super::error::{DomainError, Result};
use super::value::Value;
use std::collections::BTreeMap;

/// Parameters supplied by the caller
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Params {
    #[default]
    None,
    Positional(Vec<Value>),
    Named(BTreeMap<String, Value>),
}

impl Params {
    pub fn none() -> Self {
        Params::None
    }

    pub fn positional<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Params::Positional(values.into_iter().map(Into::into).collect())
    }

    /// Keys may be given with or without the leading `:`
    pub fn named<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        Params::Named(
            entries
                .into_iter()
                .map(|(k, v)| (k.as_ref().trim_start_matches(':').to_string(), v.into()))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Params::None => true,
            Params::Positional(v) => v.is_empty(),
            Params::Named(m) => m.is_empty(),
        }
    }
}

/// A placeholder as referenced by the query text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    Ordinal(usize),
    Named(String),
}

impl std::fmt::Display for Placeholder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Placeholder::Ordinal(n) => write!(f, "?{}", n),
            Placeholder::Named(name) => write!(f, ":{}", name),
        }
    }
}

/// Executable statement: driver-ready SQL plus arguments in bind order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    /// Statement without parameters
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }
}

/// Query text with its placeholders extracted
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    sql: String,
    placeholders: Vec<Placeholder>,
}

impl ParsedQuery {
    /// Parse a single statement; a trailing `;` is dropped.
    pub fn parse(sql: &str) -> Result<Self> {
        let pieces = lex(sql)?;
        let mut out = String::with_capacity(sql.len());
        let mut placeholders = Vec::new();
        let mut highest = 0usize;
        let mut terminated = false;

        for piece in pieces {
            match piece {
                Piece::Code(text) => {
                    if !terminated {
                        out.push_str(text);
                    } else if !text.trim().is_empty() {
                        return Err(DomainError::ValidationError(
                            "query text contains more than one statement".to_string(),
                        ));
                    }
                }
                Piece::Comment(_) => {
                    if !terminated {
                        out.push(' ');
                    }
                }
                Piece::Param { kind, .. } => {
                    if terminated {
                        return Err(DomainError::ValidationError(
                            "query text contains more than one statement".to_string(),
                        ));
                    }
                    let placeholder = match kind {
                        ParamKind::Anonymous => {
                            highest += 1;
                            Placeholder::Ordinal(highest)
                        }
                        ParamKind::Ordinal(n) => {
                            highest = highest.max(n);
                            Placeholder::Ordinal(n)
                        }
                        ParamKind::Named(name) => Placeholder::Named(name.to_string()),
                    };
                    placeholders.push(placeholder);
                    out.push('?');
                }
                Piece::Terminator => terminated = true,
            }
        }

        Ok(Self {
            sql: out.trim_end().to_string(),
            placeholders,
        })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    /// Bind caller parameters. Every placeholder must be satisfied and every
    /// supplied parameter must be referenced.
    pub fn bind(&self, params: &Params) -> Result<Statement> {
        let empty_named = BTreeMap::new();
        let (positional, named): (&[Value], &BTreeMap<String, Value>) = match params {
            Params::None => (&[], &empty_named),
            Params::Positional(values) => (values.as_slice(), &empty_named),
            Params::Named(map) => (&[], map),
        };

        let statement = self.bind_values(positional, named)?;

        for idx in 1..=positional.len() {
            if !self.placeholders.contains(&Placeholder::Ordinal(idx)) {
                return Err(DomainError::UnknownParameter(format!("?{}", idx)));
            }
        }
        for key in named.keys() {
            if !self.placeholders.contains(&Placeholder::Named(key.clone())) {
                return Err(DomainError::UnknownParameter(format!(":{}", key)));
            }
        }

        Ok(statement)
    }

    /// Bind ordinals from `positional` and names from `named`; unused
    /// values are ignored.
    pub fn bind_values(
        &self,
        positional: &[Value],
        named: &BTreeMap<String, Value>,
    ) -> Result<Statement> {
        let args = self
            .placeholders
            .iter()
            .map(|p| {
                let value = match p {
                    Placeholder::Ordinal(n) => positional.get(n - 1),
                    Placeholder::Named(name) => named.get(name),
                };
                value
                    .cloned()
                    .ok_or_else(|| DomainError::MissingParameter(p.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Statement::new(self.sql.clone(), args))
    }

    /// Copy of this query restricted to a result window
    pub fn windowed(&self, window: Window) -> Self {
        Self {
            sql: window.apply(&self.sql),
            placeholders: self.placeholders.clone(),
        }
    }
}

/// Result window (`firstResult` / `maxResults`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub first_result: usize,
    pub max_results: usize,
}

impl Window {
    /// A window exists only when both bounds are given
    pub fn from_bounds(first_result: Option<usize>, max_results: Option<usize>) -> Option<Self> {
        match (first_result, max_results) {
            (Some(first_result), Some(max_results)) => Some(Self {
                first_result,
                max_results,
            }),
            _ => None,
        }
    }

    /// Append the window, or wrap the query when it already carries its
    /// own `LIMIT` clause.
    pub fn apply(&self, sql: &str) -> String {
        let body = sql.trim_end().trim_end_matches(';').trim_end();
        if has_top_level_limit(body) {
            format!(
                "SELECT * FROM ({}) LIMIT {} OFFSET {}",
                body, self.max_results, self.first_result
            )
        } else {
            format!(
                "{} LIMIT {} OFFSET {}",
                body, self.max_results, self.first_result
            )
        }
    }
}

// Expects comment-free text, as produced by `ParsedQuery::parse`.
fn has_top_level_limit(sql: &str) -> bool {
    let bytes = sql.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
            }
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            c if depth == 0 && c.is_ascii_alphabetic() => {
                let from = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                let starts_word = from == 0 || !(bytes[from - 1].is_ascii_alphanumeric() || bytes[from - 1] == b'_');
                if starts_word && sql[from..i].eq_ignore_ascii_case("limit") {
                    return true;
                }
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    false
}

/// Split a multi-statement body on `;` outside literals and comments.
/// Comment-only fragments are dropped.
pub fn split_statements(body: &str) -> Result<Vec<String>> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut has_code = false;

    for piece in lex(body)? {
        match piece {
            Piece::Code(text) => {
                has_code |= !text.trim().is_empty();
                current.push_str(text);
            }
            Piece::Comment(text) => current.push_str(text),
            Piece::Param { raw, .. } => {
                has_code = true;
                current.push_str(raw);
            }
            Piece::Terminator => {
                if has_code {
                    statements.push(current.trim().to_string());
                }
                current.clear();
                has_code = false;
            }
        }
    }
    if has_code {
        statements.push(current.trim().to_string());
    }

    Ok(statements)
}

enum ParamKind<'a> {
    Anonymous,
    Ordinal(usize),
    Named(&'a str),
}

enum Piece<'a> {
    Code(&'a str),
    Comment(&'a str),
    Param { kind: ParamKind<'a>, raw: &'a str },
    Terminator,
}

// All delimiters are ASCII, so byte offsets always fall on char boundaries.
fn lex(sql: &str) -> Result<Vec<Piece<'_>>> {
    let bytes = sql.as_bytes();
    let len = bytes.len();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < len {
        let next = bytes.get(i + 1).copied();
        match bytes[i] {
            quote @ (b'\'' | b'"' | b'`') => {
                let from = i;
                i += 1;
                while i < len && bytes[i] != quote {
                    i += 1;
                }
                if i >= len {
                    return Err(DomainError::ValidationError(format!(
                        "unterminated quoted text starting at byte {}",
                        from
                    )));
                }
                i += 1;
            }
            b'-' if next == Some(b'-') => {
                flush(&mut pieces, sql, start, i);
                let from = i;
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
                pieces.push(Piece::Comment(&sql[from..i]));
                start = i;
            }
            b'/' if next == Some(b'*') => {
                flush(&mut pieces, sql, start, i);
                let from = i;
                i += 2;
                loop {
                    if i + 1 >= len {
                        return Err(DomainError::ValidationError(
                            "unterminated block comment".to_string(),
                        ));
                    }
                    if bytes[i] == b'*' && bytes[i + 1] == b'/' {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
                pieces.push(Piece::Comment(&sql[from..i]));
                start = i;
            }
            b'?' => {
                flush(&mut pieces, sql, start, i);
                let from = i;
                i += 1;
                let digits = i;
                while i < len && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                let kind = if digits == i {
                    ParamKind::Anonymous
                } else {
                    let n: usize = sql[digits..i].parse().map_err(|_| {
                        DomainError::ValidationError(format!(
                            "invalid parameter ordinal {}",
                            &sql[from..i]
                        ))
                    })?;
                    if n == 0 {
                        return Err(DomainError::ValidationError(
                            "parameter ordinals start at ?1".to_string(),
                        ));
                    }
                    ParamKind::Ordinal(n)
                };
                pieces.push(Piece::Param {
                    kind,
                    raw: &sql[from..i],
                });
                start = i;
            }
            b':' if next == Some(b':') => i += 2,
            b':' if next.is_some_and(|c| c.is_ascii_alphabetic() || c == b'_') => {
                flush(&mut pieces, sql, start, i);
                let from = i;
                i += 1;
                while i < len && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                pieces.push(Piece::Param {
                    kind: ParamKind::Named(&sql[from + 1..i]),
                    raw: &sql[from..i],
                });
                start = i;
            }
            b';' => {
                flush(&mut pieces, sql, start, i);
                pieces.push(Piece::Terminator);
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    flush(&mut pieces, sql, start, len);

    Ok(pieces)
}

fn flush<'a>(pieces: &mut Vec<Piece<'a>>, sql: &'a str, from: usize, to: usize) {
    if to > from {
        pieces.push(Piece::Code(&sql[from..to]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_placeholders() {
        let q = ParsedQuery::parse("SELECT * FROM t WHERE a = ?1 AND b = :name AND c = ?2").unwrap();
        assert_eq!(q.sql(), "SELECT * FROM t WHERE a = ? AND b = ? AND c = ?");
        assert_eq!(
            q.placeholders(),
            &[
                Placeholder::Ordinal(1),
                Placeholder::Named("name".into()),
                Placeholder::Ordinal(2)
            ]
        );
    }

    #[test]
    fn test_anonymous_placeholders_follow_highest_ordinal() {
        let q = ParsedQuery::parse("VALUES (?, ?3, ?)").unwrap();
        assert_eq!(
            q.placeholders(),
            &[
                Placeholder::Ordinal(1),
                Placeholder::Ordinal(3),
                Placeholder::Ordinal(4)
            ]
        );
    }

    #[test]
    fn test_literals_comments_and_casts_are_skipped() {
        let q = ParsedQuery::parse(
            "SELECT ':x', \"?\" -- ?1 :y\n, v::text /* :z ? */ FROM t WHERE id = :id;",
        )
        .unwrap();
        assert_eq!(q.placeholders(), &[Placeholder::Named("id".into())]);
        assert!(q.sql().ends_with("WHERE id = ?"));
    }

    #[test]
    fn test_doubled_quote_inside_literal() {
        let q = ParsedQuery::parse("SELECT 'it''s ?' WHERE a = ?").unwrap();
        assert_eq!(q.placeholders().len(), 1);
    }

    #[test]
    fn test_multiple_statements_rejected() {
        assert!(ParsedQuery::parse("DELETE FROM a; DELETE FROM b").is_err());
        assert!(ParsedQuery::parse("DELETE FROM a;  -- trailing comment").is_ok());
    }

    #[test]
    fn test_unterminated_literal() {
        assert!(matches!(
            ParsedQuery::parse("SELECT 'oops"),
            Err(DomainError::ValidationError(_))
        ));
        assert!(ParsedQuery::parse("SELECT ?0").is_err());
    }

    #[test]
    fn test_bind_positional() {
        let q = ParsedQuery::parse("SELECT * FROM t WHERE a = ?2 OR b = ?1 OR c = ?1").unwrap();
        let stmt = q.bind(&Params::positional([10i64, 20i64])).unwrap();
        assert_eq!(
            stmt.args,
            vec![Value::Integer(20), Value::Integer(10), Value::Integer(10)]
        );
    }

    #[test]
    fn test_bind_named_accepts_colon_prefixed_keys() {
        let q = ParsedQuery::parse("SELECT * FROM t WHERE name = :name").unwrap();
        let stmt = q.bind(&Params::named([(":name", "bob")])).unwrap();
        assert_eq!(stmt.args, vec![Value::Text("bob".into())]);
    }

    #[test]
    fn test_bind_rejects_missing_and_unknown() {
        let q = ParsedQuery::parse("SELECT * FROM t WHERE a = ?1").unwrap();
        assert_eq!(
            q.bind(&Params::none()).unwrap_err(),
            DomainError::MissingParameter("?1".into())
        );
        assert_eq!(
            q.bind(&Params::positional([1i64, 2i64])).unwrap_err(),
            DomainError::UnknownParameter("?2".into())
        );

        let q = ParsedQuery::parse("SELECT * FROM t WHERE a = :a").unwrap();
        assert_eq!(
            q.bind(&Params::named([("a", 1i64), ("b", 2i64)])).unwrap_err(),
            DomainError::UnknownParameter(":b".into())
        );
    }

    #[test]
    fn test_window() {
        assert_eq!(Window::from_bounds(Some(0), None), None);
        let window = Window::from_bounds(Some(20), Some(10)).unwrap();
        assert_eq!(
            window.apply("SELECT * FROM t ORDER BY id;"),
            "SELECT * FROM t ORDER BY id LIMIT 10 OFFSET 20"
        );
        assert_eq!(
            window.apply("SELECT * FROM t ORDER BY id LIMIT 100"),
            "SELECT * FROM (SELECT * FROM t ORDER BY id LIMIT 100) LIMIT 10 OFFSET 20"
        );
        // Nested or quoted LIMIT does not count
        assert_eq!(
            window.apply("SELECT * FROM t WHERE id IN (SELECT id FROM u LIMIT 3) AND note = 'limit'"),
            "SELECT * FROM t WHERE id IN (SELECT id FROM u LIMIT 3) AND note = 'limit' LIMIT 10 OFFSET 20"
        );
    }

    #[test]
    fn test_split_statements() {
        let body = "UPDATE a SET x = ?1; -- note; not a split\nINSERT INTO b VALUES (';');\n-- only a comment";
        let statements = split_statements(body).unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0], "UPDATE a SET x = ?1");
        assert!(statements[1].ends_with("INSERT INTO b VALUES (';')"));
    }
}
