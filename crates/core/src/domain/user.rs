use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

pub const MAX_USER_NAME_CHARS: usize = 50;
pub const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Short-name to full-name mapping used by the prompt to resolve assignee
/// mentions ("ravi" -> "Ravi Kumar"). Read-only input to extraction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactAlias {
    pub short_name: String,
    pub full_name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub contacts: Vec<ContactAlias>,
    pub created_at: DateTime<Utc>,
}

/// Minimal shape check; deliverability is not our concern.
pub fn validate_email(email: &str) -> Result<(), DomainError> {
    let Some((local, domain)) = email.split_once('@') else {
        return Err(DomainError::InvariantViolation(format!("invalid email address `{email}`")));
    };
    let domain_ok = domain.split_once('.').is_some_and(|(host, tld)| {
        !host.is_empty() && tld.len() >= 2 && !tld.ends_with('.')
    });
    if local.is_empty() || !domain_ok || email.contains(char::is_whitespace) {
        return Err(DomainError::InvariantViolation(format!("invalid email address `{email}`")));
    }
    Ok(())
}

pub fn validate_registration(name: &str, email: &str, password: &str) -> Result<(), DomainError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_USER_NAME_CHARS {
        return Err(DomainError::InvariantViolation(format!(
            "name must be between 1 and {MAX_USER_NAME_CHARS} characters"
        )));
    }
    validate_email(email)?;
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(DomainError::InvariantViolation(format!(
            "password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }
    // A password containing the user's first name is trivially guessable.
    if let Some(first_name) = name.split_whitespace().next() {
        if password.to_lowercase().contains(&first_name.to_lowercase()) {
            return Err(DomainError::InvariantViolation(
                "password should not contain your name".to_string(),
            ));
        }
    }
    Ok(())
}
