use deadpool_postgres::Pool;

use crate::{error::Result, models::class::Class};

/// Creates a new class owned by an instructor.
pub async fn create_class(
    pool: &Pool,
    name: &str,
    code: &str,
    instructor_id: i64,
    schedule: Option<&str>,
) -> Result<Class> {
    let client = pool.get().await?;
    let row = client
        .query_one(
            r#"
            INSERT INTO classes (name, code, instructor_id, schedule)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
            &[&name, &code, &instructor_id, &schedule],
        )
        .await?;
    Ok(Class::from(&row))
}

/// Finds a class by its ID.
pub async fn find_by_id(pool: &Pool, class_id: i64) -> Result<Option<Class>> {
    let client = pool.get().await?;
    let row = client
        .query_opt(
            r#"
            SELECT *
            FROM classes
            WHERE id = $1
            "#,
            &[&class_id],
        )
        .await?;
    Ok(row.map(|r| Class::from(&r)))
}

/// Lists the classes owned by an instructor, newest first.
pub async fn list_by_instructor(pool: &Pool, instructor_id: i64) -> Result<Vec<Class>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT *
            FROM classes
            WHERE instructor_id = $1
            ORDER BY created_at DESC
            "#,
            &[&instructor_id],
        )
        .await?;
    Ok(rows.iter().map(Class::from).collect())
}

/// Lists all classes, newest first.
pub async fn list_all(pool: &Pool) -> Result<Vec<Class>> {
    let client = pool.get().await?;
    let rows = client
        .query(
            r#"
            SELECT *
            FROM classes
            ORDER BY created_at DESC
            "#,
            &[],
        )
        .await?;
    Ok(rows.iter().map(Class::from).collect())
}
