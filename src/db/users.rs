use chrono::Utc;

use super::DbPool;
use crate::models::{HelpFlags1, RoleType, SignedInUser};

/// User to insert
#[derive(Debug, Clone)]
pub struct NewUser {
    pub org_id: i64,
    pub org_name: String,
    pub org_role: RoleType,
    pub login: String,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

type UserRow = (i64, i64, String, String, String, String, String, i64, i64, i64);

fn user_from_row(row: UserRow) -> SignedInUser {
    let (user_id, org_id, org_name, org_role, login, name, email, is_admin, help_flags1, last_seen_at) =
        row;

    let org_role = org_role.parse::<RoleType>().unwrap_or_else(|e| {
        tracing::warn!(user_id, "Unknown org role stored for user: {}", e);
        RoleType::Viewer
    });

    SignedInUser {
        user_id,
        org_id,
        org_name,
        org_role,
        login,
        name,
        email,
        is_server_admin: is_admin != 0,
        is_anonymous: false,
        help_flags1: HelpFlags1(help_flags1 as u64),
        last_seen_at,
    }
}

pub async fn create_user(pool: &DbPool, user: &NewUser) -> Result<i64, sqlx::Error> {
    let now = Utc::now().timestamp();

    let result = sqlx::query(
        r#"
        INSERT INTO users (org_id, org_name, org_role, login, name, email, is_admin, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.org_id)
    .bind(&user.org_name)
    .bind(user.org_role.to_string())
    .bind(&user.login)
    .bind(&user.name)
    .bind(&user.email)
    .bind(user.is_admin as i64)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Load the identity of a user for the current request
pub async fn find_signed_in_user(
    pool: &DbPool,
    user_id: i64,
) -> Result<Option<SignedInUser>, sqlx::Error> {
    let row: Option<UserRow> = sqlx::query_as(
        r#"
        SELECT id, org_id, org_name, org_role, login, name, email, is_admin, help_flags1, last_seen_at
        FROM users WHERE id = ?
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(user_from_row))
}

pub async fn set_help_flags(
    pool: &DbPool,
    user_id: i64,
    flags: HelpFlags1,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET help_flags1 = ? WHERE id = ?")
        .bind(flags.bits() as i64)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn update_last_seen(pool: &DbPool, user_id: i64, now: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET last_seen_at = ? WHERE id = ?")
        .bind(now)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}
