//! Postgres-backed document store.
//! Each collection is a table of `(id uuid, doc jsonb, created_at timestamptz)`.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use std::time::Duration;
use uuid::Uuid;

use super::store::{is_id_field, CollectionSpec, Document, DocumentStore, Filter, StoreError};
use crate::config::DatabaseConfig;

const UNIQUE_VIOLATION: &str = "23505";

pub struct PgDocumentStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct DocumentRow {
    id: Uuid,
    doc: Value,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        let fields = match row.doc {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Document::new(row.id, fields)
    }
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await
            .map_err(|e| classify("", e))?;
        Ok(Self::new(pool))
    }
}

/// Quote SQL identifier to prevent injection
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn unique_index_name(collection: &str, field: &str) -> String {
    format!("{}_{}_key", collection, field)
}

/// Build the WHERE clause for an exact-match filter. Field names and values are
/// both bound as parameters, starting at `$first`. Object and array values are
/// excluded so matching agrees with the in-memory store.
fn where_clause(filter: &Filter, first: usize) -> (String, Vec<String>) {
    if filter.is_empty() {
        return (String::new(), Vec::new());
    }

    let mut conditions = Vec::with_capacity(filter.len());
    let mut params = Vec::with_capacity(filter.len() * 2);
    let mut n = first;
    for (field, value) in filter {
        if is_id_field(field) {
            conditions.push(format!("id::text = ${}", n));
            params.push(value.clone());
            n += 1;
        } else {
            conditions.push(format!(
                "(jsonb_typeof(doc -> ${0}) NOT IN ('object', 'array') AND doc ->> ${0} = ${1})",
                n,
                n + 1
            ));
            params.push(field.clone());
            params.push(value.clone());
            n += 2;
        }
    }
    (format!(" WHERE {}", conditions.join(" AND ")), params)
}

/// Map a driver error onto the store taxonomy. Transport failures mean the
/// store is unreachable right now, whatever happened at startup.
fn classify(collection: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Unavailable(err.to_string())
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(e.to_string()),
        sqlx::Error::Tls(e) => StoreError::Unavailable(e.to_string()),
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            let prefix = format!("{}_", collection);
            let field = db
                .constraint()
                .and_then(|c| c.strip_prefix(prefix.as_str()))
                .and_then(|c| c.strip_suffix("_key"))
                .unwrap_or("unknown")
                .to_string();
            StoreError::UniqueViolation { collection: collection.to_string(), field }
        }
        other => StoreError::Sqlx(other),
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| classify("", e))?;
        Ok(())
    }

    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<(), StoreError> {
        let table = quote_identifier(&spec.name);
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (\
                id uuid PRIMARY KEY, \
                doc jsonb NOT NULL DEFAULT '{{}}'::jsonb, \
                created_at timestamptz NOT NULL DEFAULT now())",
            table
        );
        sqlx::query(&ddl)
            .execute(&self.pool)
            .await
            .map_err(|e| classify(&spec.name, e))?;

        for field in &spec.unique {
            let ddl = format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ((doc ->> {}))",
                quote_identifier(&unique_index_name(&spec.name, field)),
                table,
                quote_literal(field)
            );
            sqlx::query(&ddl)
                .execute(&self.pool)
                .await
                .map_err(|e| classify(&spec.name, e))?;
        }

        tracing::debug!("Ensured collection table: {}", spec.name);
        Ok(())
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let (clause, params) = where_clause(filter, 1);
        let sql = format!(
            "SELECT id, doc FROM {}{} ORDER BY created_at, id",
            quote_identifier(collection),
            clause
        );

        let mut q = sqlx::query_as::<_, DocumentRow>(&sql);
        for p in params.iter() {
            q = q.bind(p);
        }
        let rows = q.fetch_all(&self.pool).await.map_err(|e| classify(collection, e))?;
        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError> {
        let sql = format!("SELECT id, doc FROM {} WHERE id = $1", quote_identifier(collection));
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(collection, e))?;
        Ok(row.map(Document::from))
    }

    async fn insert(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> Result<Document, StoreError> {
        let sql = format!(
            "INSERT INTO {} (id, doc) VALUES ($1, $2) RETURNING id, doc",
            quote_identifier(collection)
        );
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(Value::Object(fields))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| classify(collection, e))?;
        Ok(row.into())
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: Uuid,
        patch: Map<String, Value>,
    ) -> Result<Option<Document>, StoreError> {
        let sql = format!(
            "UPDATE {} SET doc = doc || $2 WHERE id = $1 RETURNING id, doc",
            quote_identifier(collection)
        );
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .bind(Value::Object(patch))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(collection, e))?;
        Ok(row.map(Document::from))
    }

    async fn delete_by_id(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<Document>, StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1 RETURNING id, doc", quote_identifier(collection));
        let row = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| classify(collection, e))?;
        Ok(row.map(Document::from))
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let (clause, params) = where_clause(filter, 1);
        let sql = format!("DELETE FROM {}{}", quote_identifier(collection), clause);

        let mut q = sqlx::query(&sql);
        for p in params.iter() {
            q = q.bind(p);
        }
        let result = q.execute(&self.pool).await.map_err(|e| classify(collection, e))?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_identifier("zxx"), "\"zxx\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
        assert_eq!(quote_literal("o'k"), "'o''k'");
    }

    #[test]
    fn empty_filter_has_no_where() {
        let (clause, params) = where_clause(&Filter::new(), 1);
        assert!(clause.is_empty());
        assert!(params.is_empty());
    }

    #[test]
    fn filter_binds_names_and_values() {
        let mut filter = Filter::new();
        filter.insert("name".into(), "x".into());
        filter.insert("_id".into(), "abc".into());
        filter.insert("message".into(), "m".into());

        let (clause, params) = where_clause(&filter, 1);
        // BTreeMap order: _id, message, name
        assert_eq!(
            clause,
            " WHERE id::text = $1 \
             AND (jsonb_typeof(doc -> $2) NOT IN ('object', 'array') AND doc ->> $2 = $3) \
             AND (jsonb_typeof(doc -> $4) NOT IN ('object', 'array') AND doc ->> $4 = $5)"
        );
        assert_eq!(params, vec!["abc", "message", "m", "name", "x"]);
    }

    #[test]
    fn pool_errors_classify_as_unavailable() {
        assert!(matches!(
            classify("zxx", sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            classify("zxx", sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            classify("zxx", sqlx::Error::RowNotFound),
            StoreError::Sqlx(_)
        ));
    }
}
