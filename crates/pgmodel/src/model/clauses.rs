//! Clause accumulation and SQL assembly.

use crate::sql::contains_join_keyword;
use crate::value::Value;

/// Reserved clause text of one query instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Clauses {
    pub(crate) select: String,
    pub(crate) join: String,
    pub(crate) filter: String,
    pub(crate) params: Vec<Value>,
    pub(crate) order: String,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
}

impl Clauses {
    pub(crate) fn add_join(&mut self, clause: &str) {
        let clause = clause.trim();
        if clause.is_empty() {
            return;
        }
        let clause = if contains_join_keyword(clause) {
            clause.to_string()
        } else {
            format!("JOIN {clause}")
        };
        if self.join.is_empty() {
            self.join = clause;
        } else {
            self.join.push(' ');
            self.join.push_str(&clause);
        }
    }

    pub(crate) fn add_where(&mut self, clause: &str, params: Vec<Value>) {
        let clause = clause.trim();
        if clause.is_empty() {
            return;
        }
        if self.filter.is_empty() {
            self.filter = clause.to_string();
        } else {
            self.filter.push_str(" and ");
            self.filter.push_str(clause);
        }
        self.params.extend(params);
    }

    pub(crate) fn reset_where(&mut self) {
        self.filter.clear();
        self.params.clear();
    }

    pub(crate) fn has_join(&self) -> bool {
        !self.join.is_empty()
    }

    pub(crate) fn select_sql(&self, table: &str) -> String {
        let select = if self.select.trim().is_empty() {
            "*"
        } else {
            self.select.as_str()
        };
        let mut sql = format!("SELECT {select} FROM {table}");
        if !self.join.is_empty() {
            sql.push(' ');
            sql.push_str(&self.join);
        }
        if !self.filter.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.filter);
        }
        if !self.order.trim().is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order);
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }
        sql
    }
}

pub(crate) fn insert_sql(table: &str, columns: &[String]) -> String {
    if columns.is_empty() {
        return format!("INSERT INTO {table} DEFAULT VALUES");
    }
    let placeholders = vec!["?"; columns.len()].join(",");
    format!(
        "INSERT INTO {table}({}) VALUES({placeholders})",
        columns.join(",")
    )
}

pub(crate) fn update_sql(table: &str, columns: &[String], filter: &str) -> String {
    let assignments = columns
        .iter()
        .map(|c| format!("{c}=?"))
        .collect::<Vec<_>>()
        .join(",");
    format!("UPDATE {table} SET {assignments} WHERE {filter}")
}

pub(crate) fn delete_sql(table: &str, filter: &str) -> String {
    format!("DELETE FROM {table} WHERE {filter}")
}

/// Predicate selecting the row with `id`, qualified when the query joins.
pub(crate) fn id_predicate(table: &str, qualified: bool, id: i64) -> String {
    if qualified {
        format!("{table}.id={id}")
    } else {
        format!("id={id}")
    }
}
