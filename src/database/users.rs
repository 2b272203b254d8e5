//! User Repository - PostgreSQL operations for accounts

use async_trait::async_trait;
use sqlx::Row;
use sqlx::postgres::PgRow;
use tracing::{debug, warn};
use uuid::Uuid;

use super::pool::{DatabasePool, map_unique_violation, to_bigint, to_count};
use super::{StoreResult, UserStore};
use crate::models::{Badge, BadgeSet, ProfileUpdate, User};

const USER_COLUMNS: &str = "id, username, email, password_hash, profile_picture, bio, \
                            badges, contribution_points, date_joined";

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let labels: Vec<String> = row.try_get("badges")?;
    let badges: BadgeSet = labels
        .iter()
        .filter_map(|label| match label.parse::<Badge>() {
            Ok(badge) => Some(badge),
            Err(e) => {
                warn!("Skipping stored badge: {}", e);
                None
            }
        })
        .collect();

    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        profile_picture: row.try_get("profile_picture")?,
        bio: row.try_get("bio")?,
        badges,
        contribution_points: to_count(row.try_get("contribution_points")?, "contribution_points")?,
        date_joined: row.try_get("date_joined")?,
    })
}

#[async_trait]
impl UserStore for DatabasePool {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, username, email, password_hash, profile_picture, bio,
                 badges, contribution_points, date_joined)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.profile_picture)
        .bind(&user.bio)
        .bind(user.badges.labels())
        .bind(to_bigint(user.contribution_points, "contribution_points")?)
        .bind(user.date_joined)
        .execute(self.pool())
        .await
        .map_err(map_unique_violation)?;

        debug!(user_id = %user.id, "User inserted");
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(&format!("SELECT {} FROM users WHERE id = ANY($1)", USER_COLUMNS))
            .bind(ids)
            .fetch_all(self.pool())
            .await?;

        rows.iter().map(user_from_row).collect()
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
            .bind(email)
            .fetch_optional(self.pool())
            .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE username = $1 OR email = $2 LIMIT 1",
            USER_COLUMNS
        ))
        .bind(username)
        .bind(email)
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE users SET
                username = COALESCE($2, username),
                email = COALESCE($3, email),
                profile_picture = COALESCE($4, profile_picture),
                bio = COALESCE($5, bio)
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(id)
        .bind(update.username.as_deref())
        .bind(update.email.as_deref())
        .bind(update.profile_picture.as_deref())
        .bind(update.bio.as_deref())
        .fetch_optional(self.pool())
        .await
        .map_err(map_unique_violation)?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn add_contribution_points(&self, id: Uuid, points: u64) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE users SET contribution_points = contribution_points + $2 WHERE id = $1",
        )
        .bind(id)
        .bind(to_bigint(points, "contribution_points")?)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn add_badge(&self, id: Uuid, badge: Badge) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users SET badges = array_append(badges, $2)
            WHERE id = $1 AND NOT ($2 = ANY(badges))
            "#,
        )
        .bind(id)
        .bind(badge.as_str())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
