// src/bootstrap.rs

use crate::{
    config::Config,
    error::AppError,
    models::user::{NewUser, UserRole},
    repositories::UserStore,
    utils::hash::hash_password,
};

/// Creates the administrator from `ADMIN_EMAIL`/`ADMIN_PASSWORD` if it does not exist yet.
/// Returns true when an account was created.
pub async fn seed_admin_user(users: &dyn UserStore, config: &Config) -> Result<bool, AppError> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(false);
    };
    let email = email.trim().to_lowercase();

    if users.find_by_email(&email).await?.is_some() {
        return Ok(false);
    }

    tracing::info!("Seeding admin user: {}", email);
    users
        .create_user(NewUser {
            email,
            password_hash: hash_password(password)?,
            display_name: "Administrator".to_string(),
            role: UserRole::Admin,
        })
        .await?;
    tracing::info!("Admin user created successfully.");

    Ok(true)
}
