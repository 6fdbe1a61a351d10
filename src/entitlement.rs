// src/entitlement.rs

//! Decides whether a user may start a test or see protected content.
//!
//! The decision is a pure function of the user record, the operator
//! allowlist and the current instant. Callers evaluate it on every
//! protected request with a freshly loaded user; the outcome is never stored.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::models::user::{SubscriptionPlan, User, UserRole};

/// Operator emails that bypass the subscription check. Matching ignores case.
#[derive(Debug, Clone, Default)]
pub struct OperatorAllowlist {
    emails: HashSet<String>,
}

impl OperatorAllowlist {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|email| email.as_ref().trim().to_lowercase())
                .filter(|email| !email.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(&email.trim().to_lowercase())
    }
}

/// Why access was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// No signed-in user. The client should redirect to sign-in.
    Unauthenticated,
    /// Signed in, but without an active paid subscription.
    Unentitled,
}

/// Why access was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Administrator,
    Operator,
    Subscribed { expires_at: DateTime<Utc> },
}

/// Full decision with the reason on either side.
pub fn evaluate(
    user: Option<&User>,
    operators: &OperatorAllowlist,
    now: DateTime<Utc>,
) -> Result<Access, Denial> {
    let user = user.ok_or(Denial::Unauthenticated)?;

    if user.role == UserRole::Admin {
        return Ok(Access::Administrator);
    }
    if operators.contains(&user.email) {
        return Ok(Access::Operator);
    }

    match (user.subscription_plan, user.subscription_expires_at) {
        (SubscriptionPlan::Free, _) => Err(Denial::Unentitled),
        (_, Some(expires_at)) if expires_at > now => Ok(Access::Subscribed { expires_at }),
        _ => Err(Denial::Unentitled),
    }
}

pub fn can_enter(user: Option<&User>, operators: &OperatorAllowlist, now: DateTime<Utc>) -> bool {
    evaluate(user, operators, now).is_ok()
}
