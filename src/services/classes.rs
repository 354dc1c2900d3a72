use tokio_postgres::error::SqlState;

use crate::{
    error::{AppError, Result},
    models::class::Class,
    models::user::Role,
    repositories::class as class_repo,
    state::AppState,
};

/// Creates a class owned by the requesting instructor.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `instructor_id` - The instructor who will own the class.
/// * `name` - Human-readable class name.
/// * `code` - Short enrollment code, unique across classes.
/// * `schedule` - Free-form schedule text.
///
/// # Returns
///
/// A `Result` containing the created `Class`.
pub async fn create_class(
    state: &AppState,
    instructor_id: i64,
    name: &str,
    code: &str,
    schedule: Option<&str>,
) -> Result<Class> {
    let class = match class_repo::create_class(&state.db, name.trim(), code, instructor_id, schedule)
        .await
    {
        Ok(class) => class,
        Err(AppError::Database(ref e)) if e.code() == Some(&SqlState::UNIQUE_VIOLATION) => {
            return Err(AppError::Validation("Class code already exists".to_string()));
        }
        Err(e) => return Err(e),
    };

    tracing::info!("✅ Class created: {} ({})", class.name, class.code);
    Ok(class)
}

/// Lists the classes visible to a user.
///
/// Instructors see the classes they own; students see every class, since
/// that is what they pick from when attending.
pub async fn list_classes(state: &AppState, user_id: i64, role: Role) -> Result<Vec<Class>> {
    match role {
        Role::Instructor => class_repo::list_by_instructor(&state.db, user_id).await,
        Role::Student => class_repo::list_all(&state.db).await,
    }
}
