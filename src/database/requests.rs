//! Request Repository - PostgreSQL operations for material requests

use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;
use tracing::debug;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{RequestStore, StoreError, StoreResult};
use crate::models::{MaterialRequest, RequestStatus};

const REQUEST_COLUMNS: &str = "id, title, description, subject, education_level, \
                               requested_by, status, fulfillment_material, request_date";

fn request_from_row(row: &PgRow) -> StoreResult<MaterialRequest> {
    let status: String = row.try_get("status")?;
    let status = status.parse::<RequestStatus>().map_err(StoreError::Corrupt)?;

    Ok(MaterialRequest {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        subject: row.try_get("subject")?,
        education_level: row.try_get("education_level")?,
        requested_by: row.try_get("requested_by")?,
        status,
        fulfillment_material: row.try_get("fulfillment_material")?,
        request_date: row.try_get("request_date")?,
    })
}

#[async_trait]
impl RequestStore for DatabasePool {
    async fn insert_request(&self, request: &MaterialRequest) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO requests
                (id, title, description, subject, education_level,
                 requested_by, status, fulfillment_material, request_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(request.id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&request.subject)
        .bind(&request.education_level)
        .bind(request.requested_by)
        .bind(request.status.as_str())
        .bind(request.fulfillment_material)
        .bind(request.request_date)
        .execute(self.pool())
        .await?;

        debug!(request_id = %request.id, "Request inserted");
        Ok(())
    }

    async fn find_request(&self, id: Uuid) -> StoreResult<Option<MaterialRequest>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM requests WHERE id = $1",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(request_from_row).transpose()
    }

    async fn list_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> StoreResult<Vec<MaterialRequest>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM requests
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY request_date DESC
            "#,
            REQUEST_COLUMNS
        ))
        .bind(status.map(|s| s.as_str()))
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(request_from_row).collect()
    }

    async fn mark_fulfilled(
        &self,
        id: Uuid,
        material_id: Uuid,
    ) -> StoreResult<Option<MaterialRequest>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE requests SET status = $2, fulfillment_material = $3
            WHERE id = $1
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(id)
        .bind(RequestStatus::Fulfilled.as_str())
        .bind(material_id)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(request_from_row).transpose()
    }
}
