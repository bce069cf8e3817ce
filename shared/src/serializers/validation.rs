use crate::attributes::phone_for_storage;
use crate::error::ApiError;
use crate::types::{Attribute, Document};
use serde_json::Value;
use validator::ValidateEmail;

/// Attributes required to create an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub given_name: String,
    pub family_name: String,
}

/// Attribute writes and deletions for an existing account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub set: Vec<Attribute>,
    pub delete: Vec<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.delete.is_empty()
    }
}

/// "phone_number" => "Phone number"
fn label(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn blank(name: &str) -> String {
    format!("{} can't be blank", label(name))
}

fn present<'a>(hash: &'a Document, name: &str) -> Option<&'a str> {
    hash.get(name)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub fn validate_new_user(hash: &Document) -> Result<NewUser, ApiError> {
    let mut errors = Vec::new();

    let email = present(hash, "email");
    match email {
        None => errors.push(blank("email")),
        Some(email) if !email.validate_email() => {
            errors.push("Email is not a valid email".to_string())
        }
        Some(_) => {}
    }
    let given_name = present(hash, "given_name");
    if given_name.is_none() {
        errors.push(blank("given_name"));
    }
    let family_name = present(hash, "family_name");
    if family_name.is_none() {
        errors.push(blank("family_name"));
    }

    match (email, given_name, family_name) {
        (Some(email), Some(given_name), Some(family_name)) if errors.is_empty() => Ok(NewUser {
            email: email.to_string(),
            given_name: given_name.to_string(),
            family_name: family_name.to_string(),
        }),
        _ => Err(ApiError::Validation(errors)),
    }
}

/// Splits a deserialized user hash into writes and deletions. An empty string
/// or null clears the attribute; phone numbers are converted to stored form.
pub fn validate_user_changes(hash: Document) -> Result<UserChanges, ApiError> {
    let mut errors = Vec::new();
    let mut changes = UserChanges::default();

    for (name, value) in hash {
        let value = match value {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s),
            _ => {
                errors.push(format!("{} is invalid", label(&name)));
                continue;
            }
        };

        match (name.as_str(), value) {
            ("email", None) => errors.push(blank("email")),
            ("email", Some(email)) if !email.validate_email() => {
                errors.push("Email is not a valid email".to_string())
            }
            ("phone_number", Some(phone)) => match phone_for_storage(&phone) {
                Some(stored) => changes.set.push(Attribute::new(name, stored)),
                None => errors.push("Phone number is invalid".to_string()),
            },
            (_, Some(value)) => changes.set.push(Attribute::new(name, value)),
            (_, None) => changes.delete.push(name),
        }
    }

    if errors.is_empty() {
        Ok(changes)
    } else {
        Err(ApiError::Validation(errors))
    }
}
