//! Material Repository - PostgreSQL operations for materials and their ratings
//!
//! Ratings live in `material_ratings`, ordered by `position`. A material is
//! always returned with its ratings attached.

use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use super::pool::{DatabasePool, to_bigint, to_count};
use super::{MaterialStore, StoreError, StoreResult};
use crate::models::{Material, Rating};

const MATERIAL_COLUMNS: &str = "id, title, description, file_url, subject, education_level, \
                                uploaded_by, average_rating, download_count, upload_date";

fn material_from_row(row: &PgRow) -> StoreResult<Material> {
    Ok(Material {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        file_url: row.try_get("file_url")?,
        subject: row.try_get("subject")?,
        education_level: row.try_get("education_level")?,
        uploaded_by: row.try_get("uploaded_by")?,
        ratings: Vec::new(),
        average_rating: row.try_get("average_rating")?,
        download_count: to_count(row.try_get("download_count")?, "download_count")?,
        upload_date: row.try_get("upload_date")?,
    })
}

impl DatabasePool {
    /// Load ratings for the given materials, grouped by material id in
    /// stored order
    async fn load_ratings(&self, ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Vec<Rating>>> {
        let mut grouped: HashMap<Uuid, Vec<Rating>> = HashMap::new();
        if ids.is_empty() {
            return Ok(grouped);
        }

        let rows = sqlx::query(
            r#"
            SELECT material_id, user_id, value
            FROM material_ratings
            WHERE material_id = ANY($1)
            ORDER BY material_id, position
            "#,
        )
        .bind(ids)
        .fetch_all(self.pool())
        .await?;

        for row in rows {
            let material_id: Uuid = row.try_get("material_id")?;
            let value: i16 = row.try_get("value")?;
            let value = u8::try_from(value)
                .map_err(|_| StoreError::Corrupt(format!("rating value {}", value)))?;

            grouped.entry(material_id).or_default().push(Rating {
                user: row.try_get("user_id")?,
                value,
            });
        }

        Ok(grouped)
    }

    async fn with_ratings(&self, rows: Vec<PgRow>) -> StoreResult<Vec<Material>> {
        let mut materials = rows
            .iter()
            .map(material_from_row)
            .collect::<StoreResult<Vec<_>>>()?;

        let ids: Vec<Uuid> = materials.iter().map(|m| m.id).collect();
        let mut ratings = self.load_ratings(&ids).await?;

        for material in &mut materials {
            material.ratings = ratings.remove(&material.id).unwrap_or_default();
        }

        Ok(materials)
    }
}

#[async_trait]
impl MaterialStore for DatabasePool {
    async fn insert_material(&self, material: &Material) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO materials
                (id, title, description, file_url, subject, education_level,
                 uploaded_by, average_rating, download_count, upload_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(material.id)
        .bind(&material.title)
        .bind(&material.description)
        .bind(&material.file_url)
        .bind(&material.subject)
        .bind(&material.education_level)
        .bind(material.uploaded_by)
        .bind(material.average_rating)
        .bind(to_bigint(material.download_count, "download_count")?)
        .bind(material.upload_date)
        .execute(self.pool())
        .await?;

        debug!(material_id = %material.id, "Material inserted");
        Ok(())
    }

    async fn find_material(&self, id: Uuid) -> StoreResult<Option<Material>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM materials WHERE id = $1",
            MATERIAL_COLUMNS
        ))
        .bind(id)
        .fetch_all(self.pool())
        .await?;

        Ok(self.with_ratings(rows).await?.into_iter().next())
    }

    async fn list_materials(&self) -> StoreResult<Vec<Material>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM materials ORDER BY upload_date DESC",
            MATERIAL_COLUMNS
        ))
        .fetch_all(self.pool())
        .await?;

        self.with_ratings(rows).await
    }

    async fn list_materials_by_uploader(&self, user_id: Uuid) -> StoreResult<Vec<Material>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM materials WHERE uploaded_by = $1 ORDER BY upload_date DESC",
            MATERIAL_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        self.with_ratings(rows).await
    }

    async fn save_ratings(&self, material: &Material) -> StoreResult<()> {
        // Ratings and average are one document; write them together.
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM material_ratings WHERE material_id = $1")
            .bind(material.id)
            .execute(&mut *tx)
            .await?;

        for (position, rating) in material.ratings.iter().enumerate() {
            let position = i32::try_from(position)
                .map_err(|_| StoreError::Corrupt(format!("rating position {}", position)))?;

            sqlx::query(
                r#"
                INSERT INTO material_ratings (material_id, user_id, value, position)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(material.id)
            .bind(rating.user)
            .bind(i16::from(rating.value))
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE materials SET average_rating = $2 WHERE id = $1")
            .bind(material.id)
            .bind(material.average_rating)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        debug!(
            material_id = %material.id,
            ratings = material.ratings.len(),
            "Ratings saved"
        );
        Ok(())
    }

    async fn increment_downloads(&self, id: Uuid) -> StoreResult<Option<Material>> {
        let rows = sqlx::query(&format!(
            "UPDATE materials SET download_count = download_count + 1 WHERE id = $1 RETURNING {}",
            MATERIAL_COLUMNS
        ))
        .bind(id)
        .fetch_all(self.pool())
        .await?;

        Ok(self.with_ratings(rows).await?.into_iter().next())
    }
}
