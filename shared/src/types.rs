use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schemaless profile record as stored in the profile tables.
pub type Document = serde_json::Map<String, serde_json::Value>;

// ========== ROLE ==========
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Host,
    Caseworker,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::Host, Role::Caseworker];

    /// Name of the identity provider group (and of the URL collection).
    pub fn group_name(self) -> &'static str {
        match self {
            Role::Admin => "admins",
            Role::Host => "hosts",
            Role::Caseworker => "caseworkers",
        }
    }

    pub fn from_group_name(name: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.group_name() == name)
    }
}

// ========== USER ==========
/// One `{Name, Value}` entry of an identity provider account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Identity provider account in its native shape.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub username: String,
    pub attributes: Vec<Attribute>,
    pub created_at: Option<DateTime<Utc>>,
}

// ========== PROFILES ==========
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProfileTable {
    HostProfiles,
    ResidentProfiles,
}

impl ProfileTable {
    pub fn partition_key(self) -> &'static str {
        match self {
            ProfileTable::HostProfiles => "host",
            ProfileTable::ResidentProfiles => "caseworker",
        }
    }

    pub fn sort_key(self) -> Option<&'static str> {
        match self {
            ProfileTable::HostProfiles => None,
            ProfileTable::ResidentProfiles => Some("id"),
        }
    }
}

/// Primary key of a profile record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProfileKey {
    Host(String),
    Resident { caseworker: String, id: String },
}

impl ProfileKey {
    /// Key for a resident profile that does not exist yet.
    pub fn new_resident(caseworker: &str) -> Self {
        ProfileKey::Resident {
            caseworker: caseworker.to_string(),
            id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn table(&self) -> ProfileTable {
        match self {
            ProfileKey::Host(_) => ProfileTable::HostProfiles,
            ProfileKey::Resident { .. } => ProfileTable::ResidentProfiles,
        }
    }

    /// Key attributes in `(name, value)` form, partition key first.
    pub fn attributes(&self) -> Vec<(&'static str, &str)> {
        match self {
            ProfileKey::Host(host) => vec![("host", host.as_str())],
            ProfileKey::Resident { caseworker, id } => {
                vec![("caseworker", caseworker.as_str()), ("id", id.as_str())]
            }
        }
    }
}

/// Result of an existence-conditioned create.
#[derive(Debug, Clone, PartialEq)]
pub enum CreateOutcome {
    Created(Document),
    AlreadyExists,
}

// ========== MEDIA ==========
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadUrl {
    pub upload_url: String,
    pub download_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaUploadRequest {
    pub content_type: Option<String>,
}

// ========== STATS ==========
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub hosts: usize,
    pub residents: usize,
}
