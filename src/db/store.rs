//! Document-oriented record store.
//!
//! Records are JSON objects grouped into collections. The pipeline and
//! the HTTP layer only need `insert` and `find`; both are expressed on the
//! `RecordStore` trait so tests can swap in `MemoryRecordStore`.

use std::cmp::Ordering;
use std::sync::Mutex;

use rusqlite::{params_from_iter, Connection, ErrorCode};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::DatabaseError;

/// Logical collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Patients,
    Users,
    Reports,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Patients => "patients",
            Collection::Users => "users",
            Collection::Reports => "reports",
        }
    }
}

/// Conjunction of top-level field equality clauses. Empty matches everything.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::all().and(field, value)
    }

    pub fn and(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.clauses.push((field.to_string(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    fn matches(&self, record: &Value) -> bool {
        self.clauses
            .iter()
            .all(|(field, expected)| record.get(field) == Some(expected))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn ascending(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: SortDirection::Descending,
        }
    }
}

/// Insert/find capability over document collections.
pub trait RecordStore: Send + Sync {
    /// Store a JSON object. Uses the record's `id` field when it holds a
    /// UUID, otherwise assigns one and writes it back into the body.
    fn insert(&self, collection: Collection, record: &Value) -> Result<Uuid, DatabaseError>;

    fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        sort: Option<&Sort>,
    ) -> Result<Vec<Value>, DatabaseError>;

    fn count(&self, collection: Collection) -> Result<usize, DatabaseError> {
        Ok(self.find(collection, &Filter::all(), None)?.len())
    }
}

/// Normalize a record for storage: must be an object, gets an `id`.
fn prepare_record(record: &Value) -> Result<(Uuid, Value), DatabaseError> {
    let Value::Object(map) = record else {
        return Err(DatabaseError::ConstraintViolation(
            "record must be a JSON object".into(),
        ));
    };

    let id = map
        .get("id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    let mut body: Map<String, Value> = map.clone();
    body.insert("id".into(), Value::String(id.to_string()));
    Ok((id, Value::Object(body)))
}

fn json_path(field: &str) -> String {
    format!("$.{field}")
}

/// SQLite-backed store. The connection is opened once and shared.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
}

impl SqliteRecordStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl RecordStore for SqliteRecordStore {
    fn insert(&self, collection: Collection, record: &Value) -> Result<Uuid, DatabaseError> {
        let (id, body) = prepare_record(record)?;
        let body_text = serde_json::to_string(&body)?;
        let created_at = chrono::Utc::now().to_rfc3339();

        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        conn.execute(
            "INSERT INTO documents (id, collection, body, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id.to_string(), collection.as_str(), body_text, created_at],
        )
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, detail)
                if err.code == ErrorCode::ConstraintViolation =>
            {
                DatabaseError::ConstraintViolation(
                    detail.unwrap_or_else(|| "constraint failed".to_string()),
                )
            }
            other => DatabaseError::Sqlite(other),
        })?;

        Ok(id)
    }

    fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        sort: Option<&Sort>,
    ) -> Result<Vec<Value>, DatabaseError> {
        let mut sql = String::from("SELECT body FROM documents WHERE collection = ?");
        let mut bindings: Vec<rusqlite::types::Value> =
            vec![collection.as_str().to_string().into()];

        for (field, expected) in &filter.clauses {
            sql.push_str(" AND json_extract(body, ?) = ?");
            bindings.push(json_path(field).into());
            bindings.push(sql_value(expected));
        }

        match sort {
            Some(sort) => {
                let direction = match sort.direction {
                    SortDirection::Ascending => "ASC",
                    SortDirection::Descending => "DESC",
                };
                sql.push_str(&format!(
                    " ORDER BY json_extract(body, ?) {direction}, rowid {direction}"
                ));
                bindings.push(json_path(&sort.field).into());
            }
            None => sql.push_str(" ORDER BY rowid ASC"),
        }

        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bindings), |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(serde_json::from_str(&row?)?);
        }
        Ok(records)
    }

    fn count(&self, collection: Collection) -> Result<usize, DatabaseError> {
        let conn = self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            [collection.as_str()],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(n).unwrap_or(0))
    }
}

/// Map a JSON scalar to what `json_extract` yields for it.
fn sql_value(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;
    match value {
        Value::Null => Sql::Null,
        Value::Bool(b) => Sql::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Sql::Integer(i),
            None => Sql::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => Sql::Text(s.clone()),
        other => Sql::Text(other.to_string()),
    }
}

/// In-process store used by tests and as a stand-in when no database is configured.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<(Collection, Value)>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn insert(&self, collection: Collection, record: &Value) -> Result<Uuid, DatabaseError> {
        let (id, body) = prepare_record(record)?;
        let mut records = self.records.lock().map_err(|_| DatabaseError::LockPoisoned)?;

        if collection == Collection::Users {
            let username = body.get("username");
            let taken = records
                .iter()
                .any(|(c, r)| *c == Collection::Users && r.get("username") == username);
            if taken {
                return Err(DatabaseError::ConstraintViolation(
                    "UNIQUE constraint failed: username".into(),
                ));
            }
        }

        records.push((collection, body));
        Ok(id)
    }

    fn find(
        &self,
        collection: Collection,
        filter: &Filter,
        sort: Option<&Sort>,
    ) -> Result<Vec<Value>, DatabaseError> {
        let records = self.records.lock().map_err(|_| DatabaseError::LockPoisoned)?;
        let mut found: Vec<Value> = records
            .iter()
            .filter(|(c, r)| *c == collection && filter.matches(r))
            .map(|(_, r)| r.clone())
            .collect();

        if let Some(sort) = sort {
            found.sort_by(|a, b| {
                let ord = compare_json(a.get(&sort.field), b.get(&sort.field));
                match sort.direction {
                    SortDirection::Ascending => ord,
                    SortDirection::Descending => ord.reverse(),
                }
            });
            if sort.direction == SortDirection::Descending {
                // Newest insert first among equal keys, like `rowid DESC`.
                stable_reverse_ties(&mut found, &sort.field);
            }
        }
        Ok(found)
    }
}

fn compare_json(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (None, Some(_)) | (Some(Value::Null), Some(_)) => Ordering::Less,
        (Some(_), None) | (Some(_), Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn stable_reverse_ties(records: &mut [Value], field: &str) {
    let mut start = 0;
    while start < records.len() {
        let mut end = start + 1;
        while end < records.len()
            && compare_json(records[start].get(field), records[end].get(field)) == Ordering::Equal
        {
            end += 1;
        }
        records[start..end].reverse();
        start = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;
    use serde_json::json;

    fn sqlite_store() -> SqliteRecordStore {
        SqliteRecordStore::new(open_memory_database().unwrap())
    }

    fn exercise_insert_and_find(store: &dyn RecordStore) {
        store
            .insert(Collection::Patients, &json!({"name": "Ada", "age": 45}))
            .unwrap();
        store
            .insert(Collection::Patients, &json!({"name": "Grace", "age": 61}))
            .unwrap();
        store
            .insert(Collection::Reports, &json!({"name": "Ada"}))
            .unwrap();

        let all = store
            .find(Collection::Patients, &Filter::all(), None)
            .unwrap();
        assert_eq!(all.len(), 2);

        let ada = store
            .find(Collection::Patients, &Filter::eq("name", "Ada"), None)
            .unwrap();
        assert_eq!(ada.len(), 1);
        assert_eq!(ada[0]["age"], 45);

        let by_age = store
            .find(Collection::Patients, &Filter::eq("age", 61), None)
            .unwrap();
        assert_eq!(by_age[0]["name"], "Grace");

        assert_eq!(store.count(Collection::Reports).unwrap(), 1);
        assert_eq!(store.count(Collection::Users).unwrap(), 0);
    }

    fn exercise_sort(store: &dyn RecordStore) {
        for (name, date) in [("b", "2024-02-01"), ("a", "2024-01-01"), ("c", "2024-03-01")] {
            store
                .insert(Collection::Reports, &json!({"name": name, "upload_date": date}))
                .unwrap();
        }
        let newest_first = store
            .find(
                Collection::Reports,
                &Filter::all(),
                Some(&Sort::descending("upload_date")),
            )
            .unwrap();
        let names: Vec<&str> = newest_first
            .iter()
            .map(|r| r["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["c", "b", "a"]);

        let oldest_first = store
            .find(
                Collection::Reports,
                &Filter::all(),
                Some(&Sort::ascending("upload_date")),
            )
            .unwrap();
        assert_eq!(oldest_first[0]["name"], "a");
    }

    #[test]
    fn sqlite_insert_and_find() {
        exercise_insert_and_find(&sqlite_store());
    }

    #[test]
    fn memory_insert_and_find() {
        exercise_insert_and_find(&MemoryRecordStore::new());
    }

    #[test]
    fn sqlite_sort() {
        exercise_sort(&sqlite_store());
    }

    #[test]
    fn memory_sort() {
        exercise_sort(&MemoryRecordStore::new());
    }

    #[test]
    fn insert_keeps_existing_uuid() {
        let store = sqlite_store();
        let id = Uuid::new_v4();
        let returned = store
            .insert(Collection::Patients, &json!({"id": id.to_string()}))
            .unwrap();
        assert_eq!(returned, id);
    }

    #[test]
    fn insert_assigns_id_into_body() {
        let store = MemoryRecordStore::new();
        let id = store.insert(Collection::Patients, &json!({"name": "x"})).unwrap();
        let found = store.find(Collection::Patients, &Filter::all(), None).unwrap();
        assert_eq!(found[0]["id"], id.to_string());
    }

    #[test]
    fn non_object_record_rejected() {
        let store = sqlite_store();
        let result = store.insert(Collection::Patients, &json!([1, 2, 3]));
        assert!(matches!(result, Err(DatabaseError::ConstraintViolation(_))));
    }

    #[test]
    fn duplicate_username_rejected() {
        for store in [
            Box::new(sqlite_store()) as Box<dyn RecordStore>,
            Box::new(MemoryRecordStore::new()),
        ] {
            store
                .insert(Collection::Users, &json!({"username": "alice"}))
                .unwrap();
            let dup = store.insert(Collection::Users, &json!({"username": "alice"}));
            assert!(matches!(dup, Err(DatabaseError::ConstraintViolation(_))));
        }
    }

    #[test]
    fn filter_value_with_quote_is_bound_not_interpolated() {
        let store = sqlite_store();
        store
            .insert(Collection::Patients, &json!({"name": "O'Brien"}))
            .unwrap();
        let found = store
            .find(Collection::Patients, &Filter::eq("name", "O'Brien"), None)
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
