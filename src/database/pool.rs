//! Database Connection Pool using sqlx

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use super::{StoreError, StoreResult};

/// PostgreSQL backend. Implements every collection trait; see the sibling
/// `users`, `materials` and `requests` modules.
#[derive(Clone)]
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    pub async fn new(connection_string: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(connection_string)
            .await?;

        info!("Connected to PostgreSQL");

        Ok(Self { pool })
    }

    pub async fn init_schema(&self) -> StoreResult<()> {
        info!("Initializing database schema...");

        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                profile_picture TEXT NOT NULL DEFAULT '',
                bio TEXT NOT NULL DEFAULT '',
                badges TEXT[] NOT NULL DEFAULT '{}',
                contribution_points BIGINT NOT NULL DEFAULT 0 CHECK (contribution_points >= 0),
                date_joined TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS materials (
                id UUID PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                file_url TEXT NOT NULL,
                subject TEXT NOT NULL,
                education_level TEXT NOT NULL,
                uploaded_by UUID NOT NULL,
                average_rating DOUBLE PRECISION NOT NULL DEFAULT 0,
                download_count BIGINT NOT NULL DEFAULT 0 CHECK (download_count >= 0),
                upload_date TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS material_ratings (
                material_id UUID NOT NULL REFERENCES materials(id) ON DELETE CASCADE,
                user_id UUID NOT NULL,
                value SMALLINT NOT NULL CHECK (value BETWEEN 1 AND 5),
                position INTEGER NOT NULL,
                PRIMARY KEY (material_id, user_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS requests (
                id UUID PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                subject TEXT NOT NULL,
                education_level TEXT NOT NULL,
                requested_by UUID NOT NULL,
                status TEXT NOT NULL DEFAULT 'Open'
                    CHECK (status IN ('Open', 'Fulfilled', 'Closed')),
                fulfillment_material UUID,
                request_date TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_materials_upload_date ON materials(upload_date DESC)",
            "CREATE INDEX IF NOT EXISTS idx_materials_uploaded_by ON materials(uploaded_by, upload_date DESC)",
            "CREATE INDEX IF NOT EXISTS idx_requests_status ON requests(status, request_date DESC)",
        ];

        for statement in statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        info!("Database schema initialized");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a unique-constraint violation to [`StoreError::Duplicate`], naming
/// the offending column when the constraint name reveals it.
pub(crate) fn map_unique_violation(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.is_unique_violation()
    {
        let field = match db_err.constraint() {
            Some(c) if c.contains("username") => "username",
            Some(c) if c.contains("email") => "email",
            _ => "record",
        };
        return StoreError::Duplicate(field.to_string());
    }
    StoreError::Database(err)
}

/// Convert a stored BIGINT counter back to its unsigned form
pub(crate) fn to_count(value: i64, column: &str) -> StoreResult<u64> {
    u64::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {}: {}", column, value)))
}

/// Convert an unsigned counter for binding as BIGINT
pub(crate) fn to_bigint(value: u64, column: &str) -> StoreResult<i64> {
    i64::try_from(value).map_err(|_| StoreError::Corrupt(format!("{} overflows BIGINT: {}", column, value)))
}
