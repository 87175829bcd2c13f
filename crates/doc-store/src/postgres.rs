use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, postgres::PgArguments, postgres::PgRow, query::Query};
use uuid::Uuid;

use crate::{
    Document, DocumentId, DocumentQuery, Filter, Result, Revision, SortKey, SortOrder, StoreError,
    document::segments,
    store::{CounterUpdate, DocumentStore, DocumentStream, ReplaceOptions},
};

const COLUMNS: &str = "collection, id, revision, created_at, updated_at, body";

/// PostgreSQL-backed document store using a single JSONB table.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

/// A positional parameter collected while building dynamic SQL.
enum Bind {
    Text(String),
    Path(Vec<String>),
    Json(serde_json::Value),
    Int(i64),
}

/// Dynamic `WHERE`/`ORDER BY` builder that numbers its own placeholders.
struct SqlBuilder {
    sql: String,
    binds: Vec<Bind>,
}

impl SqlBuilder {
    fn new(head: &str) -> Self {
        Self {
            sql: head.to_string(),
            binds: Vec::new(),
        }
    }

    fn param(&mut self, bind: Bind) -> String {
        self.binds.push(bind);
        format!("${}", self.binds.len())
    }

    fn push_where(&mut self, query: &DocumentQuery) {
        let collection = self.param(Bind::Text(query.collection.clone()));
        self.sql.push_str(&format!(" WHERE collection = {collection}"));

        for filter in &query.filters {
            let clause = match filter {
                Filter::Eq { path, value } => {
                    let path = self.param(Bind::Path(segments(path)));
                    let value = self.param(Bind::Json(value.clone()));
                    format!("body #> {path} = {value}")
                }
                Filter::AnyElement {
                    array,
                    field,
                    value,
                } => {
                    let array = self.param(Bind::Path(segments(array)));
                    let field = self.param(Bind::Path(segments(field)));
                    let value = self.param(Bind::Json(value.clone()));
                    format!(
                        "jsonb_typeof(body #> {array}) = 'array' AND EXISTS (\
                         SELECT 1 FROM jsonb_array_elements(body #> {array}) AS e \
                         WHERE e #> {field} = {value})"
                    )
                }
                Filter::AllElements {
                    array,
                    field,
                    value,
                } => {
                    let array = self.param(Bind::Path(segments(array)));
                    let field = self.param(Bind::Path(segments(field)));
                    let value = self.param(Bind::Json(value.clone()));
                    format!(
                        "jsonb_typeof(body #> {array}) = 'array' AND NOT EXISTS (\
                         SELECT 1 FROM jsonb_array_elements(body #> {array}) AS e \
                         WHERE e #> {field} IS DISTINCT FROM {value})"
                    )
                }
                Filter::Contains { path, needle } => {
                    let path = self.param(Bind::Path(segments(path)));
                    let pattern = self.param(Bind::Text(like_pattern(needle)));
                    format!("body #>> {path} ILIKE {pattern}")
                }
                Filter::Range { path, min, max } => {
                    let path = self.param(Bind::Path(segments(path)));
                    let mut bounds = Vec::new();
                    if let Some(min) = min {
                        let min = self.param(Bind::Int(*min));
                        bounds.push(format!("(body #>> {path})::numeric >= {min}"));
                    }
                    if let Some(max) = max {
                        let max = self.param(Bind::Int(*max));
                        bounds.push(format!("(body #>> {path})::numeric <= {max}"));
                    }
                    let bounds = if bounds.is_empty() {
                        "true".to_string()
                    } else {
                        bounds.join(" AND ")
                    };
                    format!(
                        "CASE WHEN jsonb_typeof(body #> {path}) = 'number' THEN {bounds} ELSE false END"
                    )
                }
            };
            self.sql.push_str(" AND ");
            self.sql.push_str(&clause);
        }
    }

    fn push_order_and_paging(&mut self, query: &DocumentQuery) {
        let direction = match query.order {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        };
        let key = match &query.sort {
            SortKey::CreatedAt => "created_at".to_string(),
            SortKey::Field(path) => {
                let path = self.param(Bind::Path(segments(path)));
                format!("body #> {path}")
            }
        };
        self.sql
            .push_str(&format!(" ORDER BY {key} {direction}, id {direction}"));

        if let Some(limit) = query.limit {
            let limit = self.param(Bind::Int(limit as i64));
            self.sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = query.offset {
            let offset = self.param(Bind::Int(offset as i64));
            self.sql.push_str(&format!(" OFFSET {offset}"));
        }
    }

    fn query(&self) -> Query<'_, Postgres, PgArguments> {
        let mut query = sqlx::query(&self.sql);
        for bind in &self.binds {
            query = match bind {
                Bind::Text(text) => query.bind(text.as_str()),
                Bind::Path(path) => query.bind(path.as_slice()),
                Bind::Json(value) => query.bind(value),
                Bind::Int(n) => query.bind(*n),
            };
        }
        query
    }
}

/// Escapes LIKE wildcards and wraps the needle for a substring match.
fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

impl PostgresDocumentStore {
    /// Creates a new PostgreSQL document store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_document(row: PgRow) -> Result<Document> {
        Ok(Document {
            collection: row.try_get("collection")?,
            id: DocumentId::from_uuid(row.try_get::<Uuid, _>("id")?),
            revision: Revision::new(row.try_get("revision")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            body: row.try_get("body")?,
        })
    }

    async fn current_revision(&self, collection: &str, id: DocumentId) -> Result<Option<Revision>> {
        let revision: Option<i64> = sqlx::query_scalar(
            "SELECT revision FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(revision.map(Revision::new))
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn insert(&self, doc: Document) -> Result<Revision> {
        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, revision, created_at, updated_at, body)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&doc.collection)
        .bind(doc.id.as_uuid())
        .bind(Revision::first().as_i64())
        .bind(doc.created_at)
        .bind(doc.updated_at)
        .bind(&doc.body)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("documents_pkey")
            {
                return StoreError::DuplicateId {
                    collection: doc.collection.clone(),
                    id: doc.id,
                };
            }
            StoreError::Database(e)
        })?;

        Ok(Revision::first())
    }

    async fn get(&self, collection: &str, id: DocumentId) -> Result<Option<Document>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM documents WHERE collection = $1 AND id = $2"
        ))
        .bind(collection)
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_document).transpose()
    }

    async fn replace(&self, doc: Document, options: ReplaceOptions) -> Result<Revision> {
        let revision: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE documents
            SET body = $3, revision = revision + 1, updated_at = now()
            WHERE collection = $1 AND id = $2 AND ($4::BIGINT IS NULL OR revision = $4)
            RETURNING revision
            "#,
        )
        .bind(&doc.collection)
        .bind(doc.id.as_uuid())
        .bind(&doc.body)
        .bind(options.expected_revision.map(|r| r.as_i64()))
        .fetch_optional(&self.pool)
        .await?;

        if let Some(revision) = revision {
            return Ok(Revision::new(revision));
        }

        match (
            self.current_revision(&doc.collection, doc.id).await?,
            options.expected_revision,
        ) {
            (Some(actual), Some(expected)) => {
                metrics::counter!("store_revision_conflicts_total").increment(1);
                Err(StoreError::RevisionConflict {
                    collection: doc.collection,
                    id: doc.id,
                    expected,
                    actual,
                })
            }
            _ => Err(StoreError::NotFound {
                collection: doc.collection,
                id: doc.id,
            }),
        }
    }

    async fn delete(&self, collection: &str, id: DocumentId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find(&self, query: DocumentQuery) -> Result<Vec<Document>> {
        let mut builder = SqlBuilder::new(&format!("SELECT {COLUMNS} FROM documents"));
        builder.push_where(&query);
        builder.push_order_and_paging(&query);

        let rows = builder.query().fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_document).collect()
    }

    async fn count(&self, query: DocumentQuery) -> Result<u64> {
        let mut builder = SqlBuilder::new("SELECT COUNT(*) AS n FROM documents");
        builder.push_where(&query);

        let row = builder.query().fetch_one(&self.pool).await?;
        let n: i64 = row.try_get("n")?;
        Ok(n as u64)
    }

    async fn delete_matching(&self, query: DocumentQuery) -> Result<u64> {
        let mut builder = SqlBuilder::new("DELETE FROM documents");
        builder.push_where(&query);

        let result = builder.query().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn stream(&self, query: DocumentQuery) -> Result<DocumentStream> {
        use futures_util::StreamExt;

        let mut builder = SqlBuilder::new(&format!("SELECT {COLUMNS} FROM documents"));
        builder.push_where(&query);
        builder.push_order_and_paging(&query);

        // The row stream borrows the SQL text, so collect eagerly and hand out an owned stream.
        let rows = builder.query().fetch_all(&self.pool).await?;
        let stream = futures_util::stream::iter(rows).map(Self::row_to_document);
        Ok(Box::pin(stream))
    }

    async fn adjust_counter(
        &self,
        collection: &str,
        id: DocumentId,
        path: &str,
        delta: i64,
        floor: i64,
    ) -> Result<CounterUpdate> {
        let path_segments = segments(path);

        let applied: Option<PgRow> = sqlx::query(
            r#"
            UPDATE documents
            SET body = jsonb_set(body, $3, to_jsonb((body #>> $3)::BIGINT + $4)),
                revision = revision + 1,
                updated_at = now()
            WHERE collection = $1 AND id = $2
              AND jsonb_typeof(body #> $3) = 'number'
              AND (body #>> $3)::BIGINT + $4 >= $5
            RETURNING (body #>> $3)::BIGINT AS value, revision
            "#,
        )
        .bind(collection)
        .bind(id.as_uuid())
        .bind(path_segments.as_slice())
        .bind(delta)
        .bind(floor)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = applied {
            return Ok(CounterUpdate::Applied {
                value: row.try_get("value")?,
                revision: Revision::new(row.try_get("revision")?),
            });
        }

        let current: Option<Option<serde_json::Value>> = sqlx::query_scalar(
            "SELECT body #> $3 FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id.as_uuid())
        .bind(path_segments.as_slice())
        .fetch_optional(&self.pool)
        .await?;

        match current {
            None => Err(StoreError::NotFound {
                collection: collection.to_string(),
                id,
            }),
            Some(value) => match value.as_ref().and_then(serde_json::Value::as_i64) {
                Some(current) => Ok(CounterUpdate::Rejected { current }),
                None => Err(StoreError::NotACounter {
                    collection: collection.to_string(),
                    id,
                    path: path.to_string(),
                }),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn where_clause_numbers_placeholders_in_order() {
        let query = DocumentQuery::collection("orders")
            .filter(Filter::eq("status", "Delivered"))
            .filter(Filter::any_element("items", "vendor", "v-1"))
            .limit(10);

        let mut builder = SqlBuilder::new("SELECT 1 FROM documents");
        builder.push_where(&query);
        builder.push_order_and_paging(&query);

        assert!(builder.sql.contains("collection = $1"));
        assert!(builder.sql.contains("body #> $2 = $3"));
        assert!(builder.sql.contains("e #> $5 = $6"));
        assert!(builder.sql.ends_with("LIMIT $7"));
        assert_eq!(builder.binds.len(), 7);
    }

    #[test]
    fn empty_range_matches_any_number() {
        let query = DocumentQuery::collection("products").filter(Filter::range("price", None, None));
        let mut builder = SqlBuilder::new("SELECT 1 FROM documents");
        builder.push_where(&query);
        assert!(builder.sql.contains("THEN true ELSE false END"));
    }
}
