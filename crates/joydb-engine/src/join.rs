//! The hash-join driver: INNER/LEFT/RIGHT/FULL joins between a left
//! row stream and a base right table.

use std::collections::HashMap;

use joydb_core::ast::JoinType;
use joydb_core::schema::{Row, Table, Value};

/// Runs a hash join between `left_rows` (already qualified, e.g.
/// `"users.id"`) and `right_table`, keyed on `right_column`. Left rows
/// are qualified with `left_table` here; right rows are qualified with
/// `right_table`.
///
/// Tie-break: a left row with k right matches emits k output rows, in
/// the positional order of right-row insertion. NULL on either join
/// column never matches.
#[must_use]
pub fn hash_join(
    join_type: JoinType,
    left_table: &str,
    left_column: &str,
    left_rows: &[Row],
    right_table: &Table,
    right_column: &str,
) -> Vec<Row> {
    let right_rows: Vec<Row> = right_table
        .select_all()
        .into_iter()
        .map(|row| row.qualify(right_table.name()))
        .collect();

    let mut right_index: HashMap<String, Vec<usize>> = HashMap::new();
    for (position, row) in right_rows.iter().enumerate() {
        let key = row
            .get(&format!("{}.{right_column}", right_table.name()))
            .unwrap_or(&Value::Null)
            .canonical_key();
        if key.is_empty() {
            continue;
        }
        right_index.entry(key).or_default().push(position);
    }

    let mut matched_right: Vec<bool> = vec![false; right_rows.len()];
    let mut output = Vec::new();

    for left_row in left_rows {
        let left_value = left_row
            .resolve(Some(left_table), left_column)
            .unwrap_or(&Value::Null);
        let key = left_value.canonical_key();

        let positions = (!key.is_empty())
            .then(|| right_index.get(&key))
            .flatten();

        match positions {
            Some(positions) if !positions.is_empty() => {
                for &position in positions {
                    matched_right[position] = true;
                    output.push(left_row.merged_with(&right_rows[position]));
                }
            }
            _ => {
                if matches!(join_type, JoinType::Left | JoinType::Full) {
                    output.push(left_row.clone());
                }
            }
        }
    }

    if matches!(join_type, JoinType::Right | JoinType::Full) {
        for (position, row) in right_rows.iter().enumerate() {
            if !matched_right[position] {
                output.push(Row::new().merged_with(row));
            }
        }
    }

    output
}
