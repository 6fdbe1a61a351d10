// src/models/user.rs

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Account role. Administrators manage content and bypass the subscription check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Student,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Admin => "admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(UserRole::Student),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription plan. Payment happens off-platform; an admin grants the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionPlan {
    Free,
    Monthly,
    Yearly,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Free => "free",
            SubscriptionPlan::Monthly => "monthly",
            SubscriptionPlan::Yearly => "yearly",
        }
    }
}

impl FromStr for SubscriptionPlan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(SubscriptionPlan::Free),
            "monthly" => Ok(SubscriptionPlan::Monthly),
            "yearly" => Ok(SubscriptionPlan::Yearly),
            other => Err(format!("unknown subscription plan '{other}'")),
        }
    }
}

/// A registered account, as returned by the identity store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    pub display_name: String,

    pub role: UserRole,

    pub subscription_plan: SubscriptionPlan,

    pub subscription_expires_at: Option<DateTime<Utc>>,

    pub created_at: Option<DateTime<Utc>>,
}

/// Raw 'users' row. Role and plan are stored as TEXT.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub role: String,
    pub subscription_plan: String,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<UserRow> for User {
    type Error = String;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            email: row.email,
            password: row.password,
            display_name: row.display_name,
            role: row.role.parse()?,
            subscription_plan: row.subscription_plan.parse()?,
            subscription_expires_at: row.subscription_expires_at,
            created_at: row.created_at,
        })
    }
}

/// Data needed to insert a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub role: UserRole,
}

/// Profile of the current user together with the live entitlement decision.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,
    pub can_take_tests: bool,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
    #[validate(length(
        min = 4,
        max = 128,
        message = "Password length must be between 4 and 128 characters."
    ))]
    pub password: String,
    #[validate(length(
        min = 1,
        max = 100,
        message = "Display name length must be between 1 and 100 characters."
    ))]
    pub display_name: String,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 254))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for an admin granting (or revoking) a subscription.
#[derive(Debug, Deserialize, Validate)]
pub struct GrantSubscriptionRequest {
    pub plan: SubscriptionPlan,
    /// Length of the grant starting now. Ignored for the free plan.
    #[validate(range(min = 1, max = 3660))]
    pub days: Option<i64>,
}
