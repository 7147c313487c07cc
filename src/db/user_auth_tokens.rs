use chrono::Utc;
use rand::Rng;

use super::DbPool;
use crate::models::{hash_token, UserAuthToken};

/// Generate a new random session token
pub fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}

type TokenRow = (i64, i64, String, String, String, String, i64, i64, i64, i64, i64);

fn token_from_row(row: TokenRow, unhashed: &str) -> UserAuthToken {
    let (
        id,
        user_id,
        auth_token,
        prev_auth_token,
        user_agent,
        client_ip,
        auth_token_seen,
        seen_at,
        rotated_at,
        created_at,
        updated_at,
    ) = row;

    UserAuthToken {
        id,
        user_id,
        auth_token,
        prev_auth_token,
        user_agent,
        client_ip,
        auth_token_seen: auth_token_seen != 0,
        seen_at,
        rotated_at,
        created_at,
        updated_at,
        unhashed_token: unhashed.to_string(),
    }
}

/// Issue a token for `user_id`; the plain value is returned once, in `unhashed_token`
pub async fn create_token(
    pool: &DbPool,
    user_id: i64,
    client_ip: &str,
    user_agent: &str,
) -> Result<UserAuthToken, sqlx::Error> {
    let unhashed = generate_token();
    let now = Utc::now().timestamp();

    let mut token = UserAuthToken {
        user_id,
        auth_token: hash_token(&unhashed),
        user_agent: user_agent.to_string(),
        client_ip: client_ip.to_string(),
        rotated_at: now,
        created_at: now,
        updated_at: now,
        unhashed_token: unhashed,
        ..Default::default()
    };

    let result = sqlx::query(
        r#"
        INSERT INTO user_auth_token
            (user_id, auth_token, prev_auth_token, user_agent, client_ip, auth_token_seen, seen_at, rotated_at, created_at, updated_at)
        VALUES (?, ?, '', ?, ?, 0, 0, ?, ?, ?)
        "#,
    )
    .bind(token.user_id)
    .bind(&token.auth_token)
    .bind(&token.user_agent)
    .bind(&token.client_ip)
    .bind(token.rotated_at)
    .bind(token.created_at)
    .bind(token.updated_at)
    .execute(pool)
    .await?;

    token.id = result.last_insert_rowid();
    Ok(token)
}

/// Find the token matching `unhashed`, including a previous value still in its rotation overlap
pub async fn lookup_token(
    pool: &DbPool,
    unhashed: &str,
) -> Result<Option<UserAuthToken>, sqlx::Error> {
    let hashed = hash_token(unhashed);

    let row: Option<TokenRow> = sqlx::query_as(
        r#"
        SELECT id, user_id, auth_token, prev_auth_token, user_agent, client_ip,
               auth_token_seen, seen_at, rotated_at, created_at, updated_at
        FROM user_auth_token
        WHERE auth_token = ? OR (prev_auth_token = ? AND prev_auth_token != '')
        "#,
    )
    .bind(&hashed)
    .bind(&hashed)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| token_from_row(r, unhashed)))
}

/// Persist a successful use of the current token; returns false if it was rotated meanwhile
pub async fn mark_seen(
    pool: &DbPool,
    token: &mut UserAuthToken,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE user_auth_token
        SET auth_token_seen = 1, seen_at = ?, updated_at = ?, prev_auth_token = ''
        WHERE id = ? AND auth_token = ?
        "#,
    )
    .bind(now)
    .bind(now)
    .bind(token.id)
    .bind(&token.auth_token)
    .execute(pool)
    .await?;

    let updated = result.rows_affected() > 0;
    if updated {
        token.mark_seen(now);
    }
    Ok(updated)
}

/// Store a rotation of `token` to a fresh value
pub async fn rotate_token(
    pool: &DbPool,
    token: &mut UserAuthToken,
    now: i64,
) -> Result<(), sqlx::Error> {
    let mut rotated = token.clone();
    rotated.rotate(&generate_token(), now);

    sqlx::query(
        r#"
        UPDATE user_auth_token
        SET auth_token = ?, prev_auth_token = ?, auth_token_seen = 0, rotated_at = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&rotated.auth_token)
    .bind(&rotated.prev_auth_token)
    .bind(rotated.rotated_at)
    .bind(rotated.updated_at)
    .bind(rotated.id)
    .execute(pool)
    .await?;

    *token = rotated;
    Ok(())
}

pub async fn revoke_token(pool: &DbPool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM user_auth_token WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
