#![forbid(unsafe_code)]

use mtree_core::TableSchema;

// json_remove takes a bounded number of path arguments per call; deeper removals nest calls.
const REMOVE_PATHS_PER_CALL: usize = 100;

/// SQL text for one configured node table. Identifiers were validated by `TableSchema`,
/// so quoting them is enough.
#[derive(Clone, Debug)]
pub(in crate::store) struct NodeSql {
    pub table: String,
    pub id: String,
    pub name: String,
    pub parent_id: String,
    pub parent_path: String,
    table_raw: String,
    parent_id_raw: String,
}

impl NodeSql {
    pub fn new(schema: &TableSchema) -> Self {
        let columns = &schema.columns;
        Self {
            table: quote(&schema.table),
            id: quote(&columns.id),
            name: quote(&columns.name),
            parent_id: quote(&columns.parent_id),
            parent_path: quote(&columns.parent_path),
            table_raw: schema.table.clone(),
            parent_id_raw: columns.parent_id.clone(),
        }
    }

    pub fn create_table(&self) -> String {
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {t} (
              {id} INTEGER PRIMARY KEY,
              {name} TEXT NOT NULL DEFAULT '',
              {parent_id} INTEGER NOT NULL DEFAULT 0,
              {path} TEXT,
              CHECK({parent_id} >= 0 AND {parent_id} <> {id})
            );

            CREATE INDEX IF NOT EXISTS {index} ON {t}({parent_id});
            "#,
            t = self.table,
            id = self.id,
            name = self.name,
            parent_id = self.parent_id,
            path = self.parent_path,
            index = quote(&format!("idx_{}_{}", self.table_raw, self.parent_id_raw)),
        )
    }

    fn columns(&self) -> String {
        format!(
            "{t}.{id}, {t}.{name}, {t}.{parent_id}, {t}.{path}",
            t = self.table,
            id = self.id,
            name = self.name,
            parent_id = self.parent_id,
            path = self.parent_path,
        )
    }

    /// Path column as a JSON array that json_each can always read: unparseable text counts
    /// as "no ancestors" so one corrupt row cannot break subtree queries.
    fn readable_path(&self) -> String {
        let column = format!("{}.{}", self.table, self.parent_path);
        format!("CASE WHEN json_valid({column}) THEN {column} ELSE '[]' END")
    }

    /// Predicate: the row's path contains the id bound as `?1`.
    fn path_contains_first_param(&self) -> String {
        format!(
            "EXISTS (SELECT 1 FROM json_each({}) AS je WHERE je.value = ?1)",
            self.readable_path()
        )
    }

    pub fn select_by_id(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            self.columns(),
            self.table,
            self.id
        )
    }

    /// Batch fetch; `?1` is a JSON array of ids.
    pub fn select_by_id_list(&self) -> String {
        format!(
            "SELECT {} FROM {t} WHERE {t}.{id} IN (SELECT value FROM json_each(?1)) ORDER BY {t}.{id}",
            self.columns(),
            t = self.table,
            id = self.id,
        )
    }

    pub fn select_path_contains(&self) -> String {
        format!(
            "SELECT {} FROM {t} WHERE {} ORDER BY {t}.{id}",
            self.columns(),
            self.path_contains_first_param(),
            t = self.table,
            id = self.id,
        )
    }

    pub fn select_children(&self) -> String {
        format!(
            "SELECT {} FROM {t} WHERE {t}.{parent_id} = ?1 ORDER BY {t}.{id}",
            self.columns(),
            t = self.table,
            parent_id = self.parent_id,
            id = self.id,
        )
    }

    pub fn select_page(&self) -> String {
        format!(
            "SELECT {} FROM {t} ORDER BY {t}.{id} LIMIT ?1 OFFSET ?2",
            self.columns(),
            t = self.table,
            id = self.id,
        )
    }

    pub fn select_all(&self) -> String {
        format!(
            "SELECT {} FROM {t} ORDER BY {t}.{id}",
            self.columns(),
            t = self.table,
            id = self.id,
        )
    }

    pub fn count_all(&self) -> String {
        format!("SELECT COUNT(1) FROM {}", self.table)
    }

    /// Rows directly or indirectly below the id bound as `?1`.
    pub fn count_below(&self) -> String {
        format!(
            "SELECT COUNT(1) FROM {t} WHERE {t}.{parent_id} = ?1 OR {}",
            self.path_contains_first_param(),
            t = self.table,
            parent_id = self.parent_id,
        )
    }

    /// Inserts a row with an empty path; `?1` name, `?2` parent column value.
    pub fn insert_returning_id(&self) -> String {
        format!(
            "INSERT INTO {t}({name}, {parent_id}, {path}) VALUES (?1, ?2, NULL) RETURNING {id}",
            t = self.table,
            name = self.name,
            parent_id = self.parent_id,
            path = self.parent_path,
            id = self.id,
        )
    }

    pub fn delete_by_id(&self) -> String {
        format!("DELETE FROM {} WHERE {} = ?1", self.table, self.id)
    }

    /// `UPDATE … SET` for the given column assignments, keyed by `?{key_index}`.
    pub fn update_columns(&self, assignments: &[&str], key_index: usize) -> String {
        let sets = assignments
            .iter()
            .enumerate()
            .map(|(index, column)| format!("{column} = ?{}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE {} SET {sets} WHERE {} = ?{key_index}",
            self.table, self.id
        )
    }

    /// One statement rewriting the path of every row below the id bound as `?1`:
    /// the first `remove_count` elements are removed, and when `with_prefix` is set the
    /// comma-separated ids bound as `?2` are put in front.
    pub fn bulk_rewrite_prefix(&self, remove_count: usize, with_prefix: bool) -> String {
        let column = format!("{}.{}", self.table, self.parent_path);
        let mut remaining = format!("json({column})");
        let mut left = remove_count;
        while left > 0 {
            let batch = left.min(REMOVE_PATHS_PER_CALL);
            let paths = vec!["'$[0]'"; batch].join(", ");
            remaining = format!("json_remove({remaining}, {paths})");
            left -= batch;
        }

        let rewritten = if with_prefix {
            format!("json('[' || ?2 || ',' || substr({remaining}, 2))")
        } else {
            remaining
        };

        format!(
            "UPDATE {t} SET {path} = {rewritten} WHERE {}",
            self.path_contains_first_param(),
            t = self.table,
            path = self.parent_path,
        )
    }

    /// CASE-expression batch update of the name column for `rows` keys.
    /// Parameters: (id, name) pairs first, then the ids again for the `IN` list.
    pub fn batch_rename(&self, rows: usize) -> String {
        let mut index = 0usize;
        let mut whens = String::new();
        for _ in 0..rows {
            whens.push_str(&format!(" WHEN ?{} THEN ?{}", index + 1, index + 2));
            index += 2;
        }
        let keys = (0..rows)
            .map(|offset| format!("?{}", index + offset + 1))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE {t} SET {name} = CASE {id}{whens} ELSE {name} END WHERE {id} IN ({keys})",
            t = self.table,
            name = self.name,
            id = self.id,
        )
    }
}

fn quote(identifier: &str) -> String {
    format!("\"{identifier}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_rewrite_nests_removals_and_binds_prefix() {
        let sql = NodeSql::new(&TableSchema::default());

        let to_root = sql.bulk_rewrite_prefix(2, false);
        assert!(to_root.starts_with(
            r#"UPDATE "nodes" SET "parent_path" = json_remove(json("nodes"."parent_path"), '$[0]', '$[0]') WHERE EXISTS"#
        ));
        assert!(!to_root.contains("?2"));

        let from_root = sql.bulk_rewrite_prefix(0, true);
        assert!(from_root.contains(r#"json('[' || ?2 || ',' || substr(json("nodes"."parent_path"), 2))"#));

        let deep = sql.bulk_rewrite_prefix(250, false);
        assert_eq!(deep.matches("json_remove(").count(), 3);
        assert_eq!(deep.matches("'$[0]'").count(), 250);
    }

    #[test]
    fn batch_rename_numbers_parameters_in_order() {
        let sql = NodeSql::new(&TableSchema::default());
        assert_eq!(
            sql.batch_rename(2),
            r#"UPDATE "nodes" SET "name" = CASE "id" WHEN ?1 THEN ?2 WHEN ?3 THEN ?4 ELSE "name" END WHERE "id" IN (?5, ?6)"#
        );
    }

    #[test]
    fn update_columns_keys_on_last_parameter() {
        let sql = NodeSql::new(&TableSchema::default());
        assert_eq!(
            sql.update_columns(&[r#""parent_id""#, r#""parent_path""#], 3),
            r#"UPDATE "nodes" SET "parent_id" = ?1, "parent_path" = ?2 WHERE "id" = ?3"#
        );
    }
}
