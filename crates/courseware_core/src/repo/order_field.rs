//! Parent-scoped position assignment.
//!
//! # Responsibility
//! - Compute the next free position for a new record among its siblings.
//! - Leave caller-supplied positions untouched.
//!
//! # Invariants
//! - Next position is `MAX(position) + 1` over siblings, or `0` with none.
//! - A sibling at `i64::MAX` leaves no automatic position; assignment fails
//!   with `DbError::PositionOverflow` instead of wrapping.
//! - Siblings match on every scope column (NULL-safe equality).
//! - Positions are assigned only before insert, never on update; gaps left by
//!   deletes are not reused.
//! - Callers run the assignment and the insert inside one `IMMEDIATE`
//!   transaction so concurrent creators under one parent are serialized.

use crate::db::{DbError, DbResult};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

/// Position column of a table plus the columns that scope it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderField {
    pub table: &'static str,
    pub column: &'static str,
    /// Empty means one global scope over the whole table.
    pub for_fields: &'static [&'static str],
}

impl OrderField {
    pub const fn new(
        table: &'static str,
        column: &'static str,
        for_fields: &'static [&'static str],
    ) -> Self {
        Self {
            table,
            column,
            for_fields,
        }
    }

    /// Returns the position a new sibling in `scope_values` should receive.
    ///
    /// `scope_values` pairs up with `for_fields` by index. A count mismatch is
    /// reported by SQLite as an invalid parameter count.
    pub fn next_position(&self, conn: &Connection, scope_values: &[Value]) -> DbResult<i64> {
        let max = conn.query_row(
            &self.max_position_sql(),
            params_from_iter(scope_values.iter()),
            |row| row.get::<_, Option<i64>>(0),
        )?;
        match max {
            None => Ok(0),
            Some(max) => max
                .checked_add(1)
                .ok_or(DbError::PositionOverflow { table: self.table }),
        }
    }

    fn max_position_sql(&self) -> String {
        let mut sql = format!(
            "SELECT MAX({column}) FROM {table} WHERE 1 = 1",
            column = self.column,
            table = self.table
        );
        for (index, field) in self.for_fields.iter().enumerate() {
            sql.push_str(&format!(" AND {field} IS ?{}", index + 1));
        }
        sql
    }
}

/// Record draft carrying a parent-scoped position.
pub trait Ordered {
    const ORDER_FIELD: OrderField;

    /// Values of `ORDER_FIELD.for_fields`, in the same order.
    fn scope_values(&self) -> Vec<Value>;
    fn position(&self) -> Option<i64>;
    fn set_position(&mut self, position: i64);
}

/// Fills in the draft's position when unset and returns the final value.
///
/// Explicit positions are returned as-is without touching storage.
pub fn assign_position<T: Ordered>(conn: &Connection, draft: &mut T) -> DbResult<i64> {
    if let Some(position) = draft.position() {
        return Ok(position);
    }

    let position = T::ORDER_FIELD.next_position(conn, &draft.scope_values())?;
    draft.set_position(position);
    debug!(
        "event=position_assign module=repo status=ok table={} position={}",
        T::ORDER_FIELD.table,
        position
    );
    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    const LESSON_ORDER: OrderField = OrderField::new("lessons", "position", &["track", "level"]);
    const GLOBAL_ORDER: OrderField = OrderField::new("lessons", "position", &[]);

    struct Lesson {
        track: String,
        level: Option<i64>,
        position: Option<i64>,
    }

    impl Ordered for Lesson {
        const ORDER_FIELD: OrderField = LESSON_ORDER;

        fn scope_values(&self) -> Vec<Value> {
            vec![
                Value::Text(self.track.clone()),
                self.level.map_or(Value::Null, Value::Integer),
            ]
        }

        fn position(&self) -> Option<i64> {
            self.position
        }

        fn set_position(&mut self, position: i64) {
            self.position = Some(position);
        }
    }

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE lessons (track TEXT NOT NULL, level INTEGER, position INTEGER NOT NULL);",
        )
        .unwrap();
        conn
    }

    fn insert(conn: &Connection, track: &str, level: Option<i64>, position: i64) {
        conn.execute(
            "INSERT INTO lessons (track, level, position) VALUES (?1, ?2, ?3);",
            params![track, level, position],
        )
        .unwrap();
    }

    fn lesson(track: &str, level: Option<i64>) -> Lesson {
        Lesson {
            track: track.to_string(),
            level,
            position: None,
        }
    }

    #[test]
    fn empty_scope_starts_at_zero() {
        let conn = setup();
        let mut draft = lesson("rust", Some(1));
        assert_eq!(assign_position(&conn, &mut draft).unwrap(), 0);
        assert_eq!(draft.position, Some(0));
    }

    #[test]
    fn next_position_is_max_plus_one_not_count() {
        let conn = setup();
        for position in [0, 1, 4] {
            insert(&conn, "rust", Some(1), position);
        }
        let mut draft = lesson("rust", Some(1));
        assert_eq!(assign_position(&conn, &mut draft).unwrap(), 5);
    }

    #[test]
    fn explicit_position_skips_lookup() {
        let conn = setup();
        insert(&conn, "rust", Some(1), 4);
        let mut draft = lesson("rust", Some(1));
        draft.position = Some(4);
        assert_eq!(assign_position(&conn, &mut draft).unwrap(), 4);
    }

    #[test]
    fn every_scope_field_must_match() {
        let conn = setup();
        insert(&conn, "rust", Some(1), 0);
        insert(&conn, "rust", Some(1), 1);
        insert(&conn, "rust", Some(2), 7);
        insert(&conn, "go", Some(1), 9);

        assert_eq!(assign_position(&conn, &mut lesson("rust", Some(1))).unwrap(), 2);
        assert_eq!(assign_position(&conn, &mut lesson("rust", Some(2))).unwrap(), 8);
        assert_eq!(assign_position(&conn, &mut lesson("go", Some(2))).unwrap(), 0);
    }

    #[test]
    fn null_scope_values_match_each_other() {
        let conn = setup();
        insert(&conn, "rust", None, 3);
        insert(&conn, "rust", Some(1), 10);
        assert_eq!(assign_position(&conn, &mut lesson("rust", None)).unwrap(), 4);
    }

    #[test]
    fn empty_for_fields_is_one_global_scope() {
        let conn = setup();
        insert(&conn, "rust", Some(1), 2);
        insert(&conn, "go", None, 6);
        assert_eq!(GLOBAL_ORDER.next_position(&conn, &[]).unwrap(), 7);
    }

    #[test]
    fn sibling_at_max_position_reports_overflow() {
        let conn = setup();
        insert(&conn, "rust", Some(1), i64::MAX);
        let mut draft = lesson("rust", Some(1));
        let err = assign_position(&conn, &mut draft).unwrap_err();
        assert!(matches!(err, DbError::PositionOverflow { table: "lessons" }));
        assert_eq!(draft.position, None);

        assert_eq!(assign_position(&conn, &mut lesson("rust", Some(2))).unwrap(), 0);
    }

    #[test]
    fn negative_explicit_positions_still_count_as_max() {
        let conn = setup();
        insert(&conn, "rust", Some(1), -3);
        assert_eq!(assign_position(&conn, &mut lesson("rust", Some(1))).unwrap(), -2);
    }

    #[test]
    fn storage_errors_propagate() {
        let conn = Connection::open_in_memory().unwrap();
        let err = LESSON_ORDER
            .next_position(&conn, &[Value::Text("rust".to_string()), Value::Null])
            .unwrap_err();
        assert!(err.to_string().contains("no such table"));
    }
}
