use deadpool_postgres::Pool;

use crate::{
    error::Result,
    models::user::{Role, User},
};

/// Creates a new user in the database.
pub async fn create_user(
    pool: &Pool,
    username: &str,
    password_hash: &str,
    role: Role,
    full_name: Option<&str>,
    email: Option<&str>,
) -> Result<User> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            INSERT INTO users (username, password_hash, role, full_name, email)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
            &[&username, &password_hash, &role, &full_name, &email],
        )
        .await?;
    Ok(User::from(&row))
}

/// Finds an active user by their login name.
pub async fn find_by_username(pool: &Pool, username: &str) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM users
            WHERE username = $1 AND is_active = true
            "#,
            &[&username],
        )
        .await?;
    Ok(row.map(|r| User::from(&r)))
}

/// Finds a user by their ID.
pub async fn find_by_id(pool: &Pool, user_id: i64) -> Result<Option<User>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM users
            WHERE id = $1
            "#,
            &[&user_id],
        )
        .await?;
    Ok(row.map(|r| User::from(&r)))
}
