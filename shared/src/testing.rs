//! In-memory adapters for exercising the route handlers without AWS.

use crate::cognito::{with_email_verified, IdentityProvider};
use crate::dynamo::ProfileStore;
use crate::error::ApiError;
use crate::s3::{download_url, MediaStore};
use crate::types::{Attribute, CreateOutcome, Document, ProfileKey, ProfileTable, Role, UploadUrl, User};
use crate::AppState;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ========== IDENTITY ==========
struct Account {
    user: User,
    role: Role,
}

/// Identity provider backed by a vector. Usernames are `fakeuser0`,
/// `fakeuser1`, ... in creation order.
#[derive(Default)]
pub struct FakeIdentityProvider {
    accounts: Mutex<Vec<Account>>,
}

impl FakeIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an account directly and returns its username.
    pub fn add_user(&self, role: Role, attributes: &[(&str, &str)]) -> String {
        let mut accounts = lock(&self.accounts);
        let username = format!("fakeuser{}", accounts.len());
        accounts.push(Account {
            user: User {
                username: username.clone(),
                attributes: attributes
                    .iter()
                    .map(|(name, value)| Attribute::new(*name, *value))
                    .collect(),
                created_at: Some(chrono::Utc::now()),
            },
            role,
        });
        username
    }

    pub fn attributes(&self, username: &str) -> Option<Vec<Attribute>> {
        lock(&self.accounts)
            .iter()
            .find(|account| account.user.username == username)
            .map(|account| account.user.attributes.clone())
    }

    pub fn attribute(&self, username: &str, name: &str) -> Option<String> {
        self.attributes(username)?
            .into_iter()
            .rev()
            .find(|attribute| attribute.name == name)
            .map(|attribute| attribute.value)
    }

    pub fn usernames(&self, role: Role) -> Vec<String> {
        lock(&self.accounts)
            .iter()
            .filter(|account| account.role == role)
            .map(|account| account.user.username.clone())
            .collect()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn create_user(
        &self,
        role: Role,
        email: &str,
        given_name: &str,
        family_name: &str,
    ) -> Result<User, ApiError> {
        let taken = lock(&self.accounts).iter().any(|account| {
            account
                .user
                .attributes
                .iter()
                .any(|attribute| attribute.name == "email" && attribute.value == email)
        });
        if taken {
            return Err(ApiError::Backend {
                status: 400,
                code: "UsernameExistsException".to_string(),
                message: "An account with the given email already exists.".to_string(),
                request_id: "fake-request".to_string(),
            });
        }

        let username = self.add_user(
            role,
            &[
                ("email", email),
                ("email_verified", "true"),
                ("given_name", given_name),
                ("family_name", family_name),
            ],
        );
        self.get_user(&username)
            .await?
            .ok_or_else(|| ApiError::Internal("created user vanished".into()))
    }

    async fn list_users(&self, role: Role) -> Result<Vec<User>, ApiError> {
        Ok(lock(&self.accounts)
            .iter()
            .filter(|account| account.role == role)
            .map(|account| account.user.clone())
            .collect())
    }

    async fn get_user(&self, username: &str) -> Result<Option<User>, ApiError> {
        Ok(lock(&self.accounts)
            .iter()
            .find(|account| account.user.username == username)
            .map(|account| account.user.clone()))
    }

    async fn get_user_role(&self, username: &str) -> Result<Option<Role>, ApiError> {
        Ok(lock(&self.accounts)
            .iter()
            .find(|account| account.user.username == username)
            .map(|account| account.role))
    }

    async fn update_user(
        &self,
        username: &str,
        set: Vec<Attribute>,
        delete: Vec<String>,
    ) -> Result<bool, ApiError> {
        let mut accounts = lock(&self.accounts);
        let Some(account) = accounts
            .iter_mut()
            .find(|account| account.user.username == username)
        else {
            return Ok(false);
        };

        let attributes = &mut account.user.attributes;
        for update in with_email_verified(set) {
            attributes.retain(|attribute| attribute.name != update.name);
            attributes.push(update);
        }
        attributes.retain(|attribute| !delete.contains(&attribute.name));
        Ok(true)
    }
}

// ========== PROFILES ==========
/// Profile tables backed by a map, with the same existence conditions as
/// the real store.
#[derive(Default)]
pub struct FakeProfileStore {
    records: Mutex<BTreeMap<ProfileKey, Document>>,
}

impl FakeProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a record unconditionally.
    pub fn insert(&self, key: ProfileKey, attributes: Document) {
        let record = with_key(&key, attributes);
        lock(&self.records).insert(key, record);
    }

    pub fn record(&self, key: &ProfileKey) -> Option<Document> {
        lock(&self.records).get(key).cloned()
    }

    pub fn len(&self, table: ProfileTable) -> usize {
        lock(&self.records)
            .keys()
            .filter(|key| key.table() == table)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.records).is_empty()
    }
}

fn with_key(key: &ProfileKey, mut attributes: Document) -> Document {
    for (name, value) in key.attributes() {
        attributes.insert(name.to_string(), Value::String(value.to_string()));
    }
    attributes
}

#[async_trait]
impl ProfileStore for FakeProfileStore {
    async fn get(&self, key: &ProfileKey) -> Result<Option<Document>, ApiError> {
        Ok(self.record(key))
    }

    async fn create(
        &self,
        key: &ProfileKey,
        attributes: Document,
    ) -> Result<CreateOutcome, ApiError> {
        let mut records = lock(&self.records);
        if records.contains_key(key) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        let record = with_key(key, attributes);
        records.insert(key.clone(), record.clone());
        Ok(CreateOutcome::Created(record))
    }

    async fn update(
        &self,
        key: &ProfileKey,
        attributes: Document,
    ) -> Result<Option<Document>, ApiError> {
        let mut records = lock(&self.records);
        let Some(record) = records.get_mut(key) else {
            return Ok(None);
        };
        let key_names: Vec<&str> = key.attributes().into_iter().map(|(name, _)| name).collect();
        for (name, value) in attributes {
            if !key_names.contains(&name.as_str()) {
                record.insert(name, value);
            }
        }
        Ok(Some(record.clone()))
    }

    async fn delete(&self, key: &ProfileKey) -> Result<bool, ApiError> {
        Ok(lock(&self.records).remove(key).is_some())
    }

    async fn scan(&self, table: ProfileTable) -> Result<Vec<Document>, ApiError> {
        Ok(lock(&self.records)
            .iter()
            .filter(|(key, _)| key.table() == table)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn query(&self, table: ProfileTable, partition: &str) -> Result<Vec<Document>, ApiError> {
        Ok(lock(&self.records)
            .iter()
            .filter(|(key, _)| key.table() == table)
            .filter(|(key, _)| key.attributes().first().map(|(_, value)| *value) == Some(partition))
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn count(&self, table: ProfileTable) -> Result<usize, ApiError> {
        Ok(self.len(table))
    }
}

// ========== MEDIA ==========
pub const FAKE_MEDIA_BUCKET: &str = "media";

/// Returns deterministic looking URLs for a fresh key.
#[derive(Default)]
pub struct FakeMediaStore;

#[async_trait]
impl MediaStore for FakeMediaStore {
    async fn create_upload_url(&self, content_type: Option<&str>) -> Result<UploadUrl, ApiError> {
        let key = uuid::Uuid::new_v4().to_string();
        let mut upload_url = format!("https://upload.s3.com/{}?acl=public-read", key);
        if let Some(content_type) = content_type {
            upload_url.push_str("&content-type=");
            upload_url.push_str(&content_type.replace('/', "%2F"));
        }
        Ok(UploadUrl {
            upload_url,
            download_url: download_url(FAKE_MEDIA_BUCKET, &key),
        })
    }
}

/// Application state wired to fresh fakes. The fakes are returned alongside
/// for seeding and inspection.
pub fn test_state() -> (
    Arc<AppState>,
    Arc<FakeIdentityProvider>,
    Arc<FakeProfileStore>,
) {
    let identity = Arc::new(FakeIdentityProvider::new());
    let store = Arc::new(FakeProfileStore::new());
    let state = AppState::new(identity.clone(), store.clone(), Arc::new(FakeMediaStore));
    (state, identity, store)
}
