//! Translator output cleanup and relation binding.
//!
//! The only relation a translated query may read is [`BOUND_RELATION`]. The
//! logical table name is rewritten to it, and the result is checked so that
//! no other table, schema, or statement kind survives.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::Error;

/// Name of the in-memory relation holding the snapshot records.
pub const BOUND_RELATION: &str = "bound_snapshot";

/// Wildcard accepted in `ilike` patterns.
pub const WILDCARD: char = '%';

static FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)```(?:sqlite|sql)?").expect("fence pattern"));

static ILIKE_OPERATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)((?:[A-Za-z_]\w*\.)?(?:[A-Za-z_]\w*|"[^"]+")|[A-Za-z_]\w*\([^()]*\))\s+(NOT\s+)?ILIKE\s+('(?:[^']|'')*')"#,
    )
        .expect("ilike pattern")
});

/// String literals and comments, whichever starts first.
static LITERAL_OR_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)'(?:[^']|'')*'|"(?:[^"]|"")*"|--[^\n]*|/\*.*?\*/"#).expect("mask pattern"));
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:[^"]|"")*"|`[^`]*`|\[[^\]]*\]|[A-Za-z_][A-Za-z0-9_$]*|\d+(?:\.\d*)?|\S"#).expect("token pattern")
});

/// Statement kinds that never belong in a read-only question.
const FORBIDDEN: &[&str] = &[
    "ATTACH", "DETACH", "PRAGMA", "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "VACUUM", "REINDEX",
    "ANALYZE", "LOAD_EXTENSION",
];

/// Words that open a subquery when they follow `(` in a relation list.
const SUBQUERY_START: &[&str] = &["SELECT", "WITH", "VALUES"];

/// Words that end a relation reference instead of naming its alias.
const CLAUSE_WORDS: &[&str] = &[
    "WHERE", "JOIN", "ON", "USING", "GROUP", "ORDER", "LIMIT", "OFFSET", "HAVING", "WINDOW", "INNER", "LEFT", "RIGHT",
    "FULL", "CROSS", "OUTER", "NATURAL", "UNION", "EXCEPT", "INTERSECT", "INDEXED", "NOT",
];

/// A translated query ready for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedQuery {
    /// Translator text with formatting fences removed; shown to the user.
    pub display: String,
    /// Text actually executed against the bound relation.
    pub runnable: String,
    /// Occurrences of the logical table name that were rebound.
    pub substitutions: usize,
}

/// Remove code fences the translator wraps around its answer.
pub fn strip_fences(raw: &str) -> String {
    FENCE.replace_all(raw, "").trim().to_string()
}

/// Rewrite `expr [NOT] ILIKE 'pattern'` into the `ilike(expr, 'pattern')` function form.
pub fn rewrite_ilike(sql: &str) -> String {
    ILIKE_OPERATOR
        .replace_all(sql, |caps: &regex::Captures<'_>| {
            let negate = if caps.get(2).is_some() { "NOT " } else { "" };
            format!("{negate}ilike({}, {})", &caps[1], &caps[3])
        })
        .into_owned()
}

/// Replace every whole-word, case-insensitive occurrence of `table` with [`BOUND_RELATION`].
///
/// Returns the rewritten text and the number of substitutions.
pub fn bind_relation(sql: &str, table: &str) -> (String, usize) {
    let Ok(pattern) = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(table))) else {
        return (sql.to_string(), 0);
    };
    let count = pattern.find_iter(sql).count();
    (pattern.replace_all(sql, BOUND_RELATION).into_owned(), count)
}

/// Case-insensitive substring test backing the `ilike` SQL function.
///
/// Wildcards are stripped from the pattern, so `%asia%` and `asia` match alike.
pub fn substring_predicate(value: &str, pattern: &str) -> bool {
    let needle: String = pattern.chars().filter(|c| *c != WILDCARD).collect();
    value.to_lowercase().contains(&needle.to_lowercase())
}

fn masked(sql: &str) -> String {
    LITERAL_OR_COMMENT
        .replace_all(sql, |caps: &regex::Captures<'_>| match caps[0].as_bytes()[0] {
            b'\'' => "''".to_string(),
            b'"' => caps[0].to_string(),
            _ => " ".to_string(),
        })
        .into_owned()
}

fn tokens(sql: &str) -> Vec<String> {
    TOKEN.find_iter(sql).map(|m| m.as_str().to_string()).collect()
}

fn is_word(token: &str, word: &str) -> bool {
    token.eq_ignore_ascii_case(word)
}

fn unquote(token: &str) -> String {
    let inner = match token.chars().next() {
        Some('"') | Some('`') | Some('[') if token.len() >= 2 => &token[1..token.len() - 1],
        _ => token,
    };
    inner.replace("\"\"", "\"").to_lowercase()
}

fn is_identifier(token: &str) -> bool {
    token.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_' || c == '"' || c == '`' || c == '[')
}

/// Index just past the parenthesised group opening at `start`.
fn skip_group(tokens: &[String], start: usize) -> usize {
    let mut depth = 0usize;
    for (offset, token) in tokens[start..].iter().enumerate() {
        match token.as_str() {
            "(" => depth += 1,
            ")" => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return start + offset + 1;
                }
            }
            _ => {}
        }
    }
    tokens.len()
}

/// Names declared by `WITH [RECURSIVE] name [(cols)] AS (...)` clauses.
fn cte_names(tokens: &[String]) -> HashSet<String> {
    let mut names = HashSet::new();
    let mut i = 0;
    while i < tokens.len() {
        if !is_word(&tokens[i], "WITH") {
            i += 1;
            continue;
        }
        let mut j = i + 1;
        if tokens.get(j).is_some_and(|t| is_word(t, "RECURSIVE")) {
            j += 1;
        }
        while let Some(name) = tokens.get(j) {
            if !is_identifier(name) {
                break;
            }
            names.insert(unquote(name));
            j += 1;
            if tokens.get(j).is_some_and(|t| t == "(") {
                j = skip_group(tokens, j);
            }
            if !tokens.get(j).is_some_and(|t| is_word(t, "AS")) {
                break;
            }
            j += 1;
            while tokens.get(j).is_some_and(|t| is_word(t, "NOT") || is_word(t, "MATERIALIZED")) {
                j += 1;
            }
            if tokens.get(j).is_some_and(|t| t == "(") {
                j = skip_group(tokens, j);
            }
            if tokens.get(j).is_some_and(|t| t == ",") {
                j += 1;
            } else {
                break;
            }
        }
        i = j.max(i + 1);
    }
    names
}

/// Index just past the `)` closing the group that encloses `start`.
fn close_group(tokens: &[String], start: usize) -> usize {
    let mut depth = 0usize;
    for (offset, token) in tokens[start..].iter().enumerate() {
        match token.as_str() {
            "(" => depth += 1,
            ")" if depth == 0 => return start + offset + 1,
            ")" => depth -= 1,
            _ => {}
        }
    }
    tokens.len()
}

/// Index past an optional `[AS] alias` at `at`.
fn skip_alias(tokens: &[String], at: usize) -> usize {
    match tokens.get(at) {
        Some(t) if is_word(t, "AS") => at + 2,
        Some(t) if is_identifier(t) && !CLAUSE_WORDS.iter().any(|w| is_word(t, w)) => at + 1,
        _ => at,
    }
}

/// Check every item of the relation list starting at `start`.
///
/// Subqueries are skipped; their own `FROM` clauses are visited by the caller's
/// scan. Parenthesised relation lists are walked item by item.
fn check_relation_list(tokens: &[String], start: usize, allowed: &dyn Fn(&str) -> bool) -> Result<(), Error> {
    let mut j = start;
    let mut depth = 0usize;

    'items: loop {
        let Some(target) = tokens.get(j) else { return Ok(()) };

        if target == "(" {
            if tokens.get(j + 1).is_some_and(|t| SUBQUERY_START.iter().any(|w| is_word(t, w))) {
                j = skip_group(tokens, j);
            } else {
                depth += 1;
                j += 1;
                continue;
            }
        } else {
            if !is_identifier(target) {
                return Err(Error::QueryRejected(format!("unexpected relation '{target}'")));
            }
            let name = unquote(target);
            if tokens.get(j + 1).is_some_and(|t| t == ".") {
                return Err(Error::QueryRejected(format!("schema-qualified relation '{name}' is not allowed")));
            }
            if tokens.get(j + 1).is_some_and(|t| t == "(") {
                return Err(Error::QueryRejected(format!("table-valued function '{name}' is not allowed")));
            }
            if !allowed(&name) {
                return Err(Error::QueryRejected(format!("unknown relation '{name}'")));
            }
            j += 1;
        }
        j = skip_alias(tokens, j);

        loop {
            match tokens.get(j).map(String::as_str) {
                None => return Ok(()),
                Some(",") => {
                    j += 1;
                    continue 'items;
                }
                Some(")") if depth > 0 => {
                    depth -= 1;
                    j = skip_alias(tokens, j + 1);
                }
                // A join inside a parenthesised list; its targets are checked by
                // the caller's scan, so resume after the enclosing `)`.
                Some(_) if depth > 0 => {
                    depth -= 1;
                    j = skip_alias(tokens, close_group(tokens, j));
                }
                Some(_) => return Ok(()),
            }
        }
    }
}

/// Check a bound query before it reaches the engine.
///
/// # Errors
///
/// Returns `Error::QueryRejected` unless the text is a single `SELECT`/`WITH`
/// statement whose `FROM`/`JOIN` targets are the bound relation, a CTE, or a
/// subquery.
pub fn validate(sql: &str) -> Result<(), Error> {
    let tokens = tokens(&masked(sql));

    let Some(first) = tokens.first() else {
        return Err(Error::QueryRejected("query is empty".into()));
    };
    if !is_word(first, "SELECT") && !is_word(first, "WITH") {
        return Err(Error::QueryRejected(format!("only SELECT queries are allowed, got '{first}'")));
    }

    let last_content = tokens.iter().rposition(|t| t != ";").unwrap_or(0);
    if tokens[..=last_content].iter().any(|t| t == ";") {
        return Err(Error::QueryRejected("multiple statements are not allowed".into()));
    }

    if let Some(word) = tokens.iter().find(|t| FORBIDDEN.iter().any(|f| is_word(t, f))) {
        return Err(Error::QueryRejected(format!("'{}' is not allowed", word.to_uppercase())));
    }

    let ctes = cte_names(&tokens);
    let allowed = |name: &str| name == BOUND_RELATION || ctes.contains(name);

    for (i, token) in tokens.iter().enumerate() {
        let opens_relation =
            is_word(token, "JOIN") || (is_word(token, "FROM") && !(i > 0 && is_word(&tokens[i - 1], "DISTINCT")));
        if opens_relation {
            check_relation_list(&tokens, i + 1, &allowed)?;
        }
    }

    Ok(())
}

/// Turn raw translator output into a query bound to the snapshot relation.
///
/// # Errors
///
/// `Error::EmptyTranslation` when nothing but fences remain, and
/// `Error::QueryRejected` when validation fails.
pub fn sanitize(raw: &str, table: &str) -> Result<SanitizedQuery, Error> {
    let display = strip_fences(raw);
    if display.is_empty() {
        return Err(Error::EmptyTranslation);
    }

    let (bound, substitutions) = bind_relation(&rewrite_ilike(&display), table);
    validate(&bound)?;

    let runnable = bound.trim().trim_end_matches(|c: char| c == ';' || c.is_whitespace()).to_string();

    Ok(SanitizedQuery { display, runnable, substitutions })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "countries_lpi";

    #[test]
    fn test_strip_fences() {
        assert_eq!(strip_fences("```sql\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_fences("```SQL SELECT 1```"), "SELECT 1");
        assert_eq!(strip_fences("```\nSELECT 1\n```\n"), "SELECT 1");
        assert_eq!(strip_fences("  SELECT 1  "), "SELECT 1");
    }

    #[test]
    fn test_strip_fences_without_language_tag_keeps_query() {
        assert_eq!(strip_fences("```SELECT country FROM t```"), "SELECT country FROM t");
    }

    #[test]
    fn test_bind_relation_every_occurrence() {
        let sql = "SELECT * FROM COUNTRIES_LPI WHERE id IN (SELECT id FROM Countries_Lpi WHERE year = 2023)";
        let (bound, count) = bind_relation(sql, TABLE);
        assert_eq!(count, 2);
        assert!(!bound.to_lowercase().contains("countries_lpi"));
        assert_eq!(bound.matches(BOUND_RELATION).count(), 2);
    }

    #[test]
    fn test_bind_relation_whole_word_only() {
        let (bound, count) = bind_relation("SELECT * FROM countries_lpi_archive", TABLE);
        assert_eq!(count, 0);
        assert!(validate(&bound).is_err());
    }

    #[test]
    fn test_bind_relation_qualified_columns() {
        let (bound, count) = bind_relation("SELECT countries_lpi.country FROM countries_lpi", TABLE);
        assert_eq!(count, 2);
        assert_eq!(bound, "SELECT bound_snapshot.country FROM bound_snapshot");
    }

    #[test]
    fn test_rewrite_ilike() {
        assert_eq!(
            rewrite_ilike("SELECT * FROM t WHERE region ILIKE '%asia%'"),
            "SELECT * FROM t WHERE ilike(region, '%asia%')"
        );
        assert_eq!(
            rewrite_ilike("SELECT * FROM t WHERE t.country not ilike 'ch%' AND year = 2023"),
            "SELECT * FROM t WHERE NOT ilike(t.country, 'ch%') AND year = 2023"
        );
        assert_eq!(rewrite_ilike("SELECT ilike(region, '%asia%')"), "SELECT ilike(region, '%asia%')");
        assert_eq!(
            rewrite_ilike("SELECT * FROM t WHERE LOWER(region) ILIKE '%latin%'"),
            "SELECT * FROM t WHERE ilike(LOWER(region), '%latin%')"
        );
        assert_eq!(
            rewrite_ilike("SELECT * FROM t WHERE trim(t.country) NOT ILIKE 'ch%'"),
            "SELECT * FROM t WHERE NOT ilike(trim(t.country), 'ch%')"
        );
    }

    #[test]
    fn test_masked_handles_apostrophes_in_comments() {
        assert_eq!(tokens(&masked("SELECT 1 -- it's\n, x -- '")), vec!["SELECT", "1", ",", "x"]);
        assert_eq!(tokens(&masked("SELECT 'a -- b' FROM t")), vec!["SELECT", "'", "'", "FROM", "t"]);
    }

    #[test]
    fn test_substring_predicate() {
        assert!(substring_predicate("Asia", "%asia%"));
        assert!(!substring_predicate("Europe", "%asia%"));
        assert!(substring_predicate("East Asia & Pacific", "ASIA"));
        assert!(substring_predicate("anything", "%"));
        assert!(!substring_predicate("", "%x%"));
    }

    #[test]
    fn test_validate_accepts_bound_queries() {
        let ok = [
            "SELECT country FROM bound_snapshot WHERE year = 2023",
            "select avg(lpi_score) from bound_snapshot b where b.year = 2023;",
            "SELECT * FROM bound_snapshot AS a JOIN bound_snapshot AS b ON a.country = b.country",
            "SELECT * FROM (SELECT country FROM bound_snapshot) sub",
            "WITH latest AS (SELECT * FROM bound_snapshot WHERE year = 2023) SELECT * FROM latest",
            "WITH RECURSIVE n(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM n LIMIT 3) SELECT x FROM n",
            "SELECT country FROM bound_snapshot WHERE country = 'made from users; drop'",
            "SELECT a.country FROM bound_snapshot a, bound_snapshot b WHERE a.id = b.id",
            "SELECT * FROM \"bound_snapshot\" -- trailing FROM users comment",
            "SELECT * FROM (bound_snapshot) b WHERE b.year = 2023",
            "SELECT * FROM (SELECT country FROM bound_snapshot) s, bound_snapshot b WHERE s.country = b.country",
            "SELECT * FROM (bound_snapshot a JOIN bound_snapshot b ON a.id = b.id) WHERE a.year = 2023",
            "SELECT * FROM (VALUES (1), (2)) v",
            "SELECT country FROM bound_snapshot WHERE country = 'it''s -- not a comment' AND year = 2023",
        ];
        for sql in ok {
            assert!(validate(sql).is_ok(), "{sql}: {:?}", validate(sql));
        }
    }

    #[test]
    fn test_validate_rejects_other_relations() {
        let rejected = [
            "SELECT * FROM users",
            "SELECT * FROM bound_snapshot, sqlite_master",
            "SELECT * FROM bound_snapshot JOIN secrets ON 1 = 1",
            "SELECT * FROM main.bound_snapshot",
            "SELECT * FROM json_each('[1]')",
            "SELECT * FROM (SELECT * FROM other_table)",
            "SELECT * FROM (sqlite_master)",
            "SELECT * FROM ((bound_snapshot), sqlite_master)",
            "SELECT * FROM (SELECT 1) s, sqlite_master",
            "SELECT * FROM (SELECT 1) AS s, bound_snapshot b, sqlite_master",
            "SELECT * FROM (bound_snapshot a JOIN bound_snapshot b ON a.id = b.id), sqlite_master",
            "SELECT * FROM bound_snapshot -- it's\n, sqlite_master -- '",
            "SELECT * FROM bound_snapshot /* it's */, sqlite_master /* ' */",
        ];
        for sql in rejected {
            assert!(matches!(validate(sql), Err(Error::QueryRejected(_))), "{sql}");
        }
    }

    #[test]
    fn test_validate_rejects_statement_kinds() {
        let rejected = [
            "ATTACH DATABASE 'x.db' AS x",
            "PRAGMA table_info(bound_snapshot)",
            "DELETE FROM bound_snapshot",
            "SELECT 1; DROP TABLE bound_snapshot",
            "SELECT load_extension('evil')",
            "",
        ];
        for sql in rejected {
            assert!(matches!(validate(sql), Err(Error::QueryRejected(_))), "{sql}");
        }
    }

    #[test]
    fn test_sanitize_fenced_query_with_repeated_table() {
        let raw = "```sql\nSELECT country FROM countries_lpi WHERE lpi_score > (SELECT AVG(lpi_score) FROM countries_lpi WHERE year = 2023) AND year = 2023;\n```";
        let query = sanitize(raw, TABLE).unwrap();
        assert_eq!(query.substitutions, 2);
        assert!(query.display.starts_with("SELECT country FROM countries_lpi"));
        assert!(!query.runnable.contains("countries_lpi"));
        assert!(!query.runnable.ends_with(';'));
    }

    #[test]
    fn test_sanitize_rejects_foreign_table() {
        let err = sanitize("SELECT * FROM pg_user", TABLE).unwrap_err();
        assert!(matches!(err, Error::QueryRejected(msg) if msg.contains("pg_user")));
    }

    #[test]
    fn test_sanitize_empty_translation() {
        assert!(matches!(sanitize("```sql\n```", TABLE), Err(Error::EmptyTranslation)));
        assert!(matches!(sanitize("   ", TABLE), Err(Error::EmptyTranslation)));
    }
}
