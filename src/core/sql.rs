//! SQL text used by the PostgreSQL session.
//!
//! Identifiers are always quoted; values travel as bind parameters.

use crate::domain::model::KeyColumn;

pub const LIST_TABLES_SQL: &str = "\
SELECT c.relname::text
FROM pg_catalog.pg_class c
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
WHERE n.nspname = $1
  AND c.relkind IN ('r', 'p')
  AND NOT c.relispartition";

pub const LIST_SEQUENCES_SQL: &str = "\
SELECT c.relname::text
FROM pg_catalog.pg_class c
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
WHERE n.nspname = $1
  AND c.relkind = 'S'";

pub const TABLE_EXISTS_SQL: &str = "\
SELECT EXISTS (
    SELECT 1
    FROM pg_catalog.pg_class c
    JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1
      AND c.relname = $2
      AND c.relkind IN ('r', 'p')
)";

pub const PRIMARY_KEY_SQL: &str = "\
SELECT a.attname::text, format_type(a.atttypid, a.atttypmod)
FROM pg_catalog.pg_index i
JOIN pg_catalog.pg_class c ON c.oid = i.indrelid
JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace
JOIN LATERAL unnest(i.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord) ON true
JOIN pg_catalog.pg_attribute a ON a.attrelid = c.oid AND a.attnum = k.attnum
WHERE i.indisprimary
  AND n.nspname = $1
  AND c.relname = $2
ORDER BY k.ord";

pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

pub fn qualified(schema: &str, name: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(name))
}

pub fn count_query(schema: &str, table: &str) -> String {
    format!("SELECT count(*) FROM {}", qualified(schema, table))
}

pub fn sequence_value_query(schema: &str, sequence: &str) -> String {
    format!("SELECT last_value FROM {}", qualified(schema, sequence))
}

/// Builds the page digest statement.
///
/// Columns: `hash` (text, NULL for an empty page), `row_count` (bigint) and
/// the text form of each key column of the last row. With `has_offset` the
/// key values bind to `$1..$n` and the limit to `$n+1`; otherwise the limit
/// is `$1`.
pub fn chunk_hash_query(schema: &str, table: &str, keys: &[KeyColumn], has_offset: bool) -> String {
    let order_inner = keys
        .iter()
        .map(|k| quote_ident(&k.name))
        .collect::<Vec<_>>()
        .join(", ");
    let order_outer = keys
        .iter()
        .map(|k| format!("t.{}", quote_ident(&k.name)))
        .collect::<Vec<_>>()
        .join(", ");

    let last_key_exprs = keys
        .iter()
        .map(|k| {
            let col = quote_ident(&k.name);
            format!(
                "(array_agg(t.{col}::text ORDER BY {order_outer}))[count(*)::int] AS {col}",
                col = col,
                order_outer = order_outer
            )
        })
        .collect::<Vec<_>>()
        .join(",\n       ");

    let (where_clause, limit_param) = if has_offset {
        let params = keys
            .iter()
            .enumerate()
            .map(|(i, k)| format!("${}::text::{}", i + 1, k.data_type))
            .collect::<Vec<_>>()
            .join(", ");
        (
            format!("\n    WHERE ({}) > ({})", order_inner, params),
            keys.len() + 1,
        )
    } else {
        (String::new(), 1)
    };

    format!(
        "SELECT md5(array_agg(md5((t.*)::varchar) ORDER BY {order_outer})::varchar) AS hash,
       count(*) AS row_count,
       {last_key_exprs}
FROM (
    SELECT * FROM {relation}{where_clause}
    ORDER BY {order_inner}
    LIMIT ${limit_param}::bigint
) t",
        order_outer = order_outer,
        last_key_exprs = last_key_exprs,
        relation = qualified(schema, table),
        where_clause = where_clause,
        order_inner = order_inner,
        limit_param = limit_param,
    )
}
