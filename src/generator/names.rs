use sqlparser::ast::Ident;

/// Words the warehouse reserves; identifiers spelled like them must be quoted.
const RESERVED_WORDS: &[&str] = &[
    "ALL", "ANALYSE", "ANALYZE", "AND", "ANY", "AS", "ASC", "AUTHORIZATION", "BETWEEN", "BINARY",
    "BOTH", "CASE", "CAST", "CHECK", "COLLATE", "COLUMN", "CONSTRAINT", "CREATE", "CROSS",
    "CURRENT_DATE", "CURRENT_TIME", "CURRENT_TIMESTAMP", "CURRENT_USER", "DEFAULT", "DEFERRABLE",
    "DESC", "DISTINCT", "DO", "ELSE", "END", "EXCEPT", "FALSE", "FOR", "FOREIGN", "FREEZE", "FROM",
    "FULL", "GRANT", "GROUP", "HAVING", "ILIKE", "IN", "INITIALLY", "INNER", "INTERSECT", "INTO",
    "IS", "ISNULL", "JOIN", "LEADING", "LEFT", "LIKE", "LIMIT", "LOCALTIME", "LOCALTIMESTAMP",
    "NATURAL", "NOT", "NOTNULL", "NULL", "OFF", "OFFSET", "OLD", "ON", "ONLY", "OR", "ORDER",
    "OUTER", "OVERLAPS", "PARALLEL", "PRIMARY", "REFERENCES", "RIGHT", "SELECT", "SESSION_USER",
    "SIMILAR", "SOME", "TABLE", "THEN", "TO", "TRAILING", "TRUE", "UNION", "UNIQUE", "USER",
    "USING", "VERBOSE", "WHEN", "WHERE", "WITH",
];

/// Return the identifier without surrounding double quotes.
pub fn unquote_identifier(ident: &str) -> &str {
    ident
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(ident)
}

/// Normalize a submitted identifier the way the warehouse folds it.
///
/// Quoted identifiers keep their spelling; bare ones are lowercased.
pub fn normalize_identifier(ident: &str) -> String {
    let trimmed = ident.trim();
    let unquoted = unquote_identifier(trimmed);
    if unquoted.len() != trimmed.len() {
        unquoted.to_string()
    } else {
        trimmed.to_ascii_lowercase()
    }
}

/// Returns true when `name` cannot be written as a bare identifier.
pub fn needs_quoting(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return true;
    };
    if !(first.is_ascii_lowercase() || first == '_') {
        return true;
    }
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '$') {
        return true;
    }
    let upper = name.to_ascii_uppercase();
    RESERVED_WORDS.contains(&upper.as_str())
}

/// Render a single identifier, double-quoting it when required.
pub fn quote_ident(name: &str) -> String {
    if needs_quoting(name) {
        Ident::with_quote('"', name).to_string()
    } else {
        Ident::new(name).to_string()
    }
}

/// Render `schema.object`.
pub fn qualified(schema: &str, object: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(object))
}
