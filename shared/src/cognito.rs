use crate::error::ApiError;
use crate::types::{Attribute, Role, User};
use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::primitives::DateTime as SmithyDateTime;
use aws_sdk_cognitoidentityprovider::types::{AttributeType, DeliveryMediumType, UserType};
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use chrono::{DateTime, Utc};

/// Largest page `ListUsersInGroup` accepts.
const LIST_PAGE_SIZE: i32 = 60;

/// User lifecycle operations over the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Creates a verified account and places it in the role's group.
    async fn create_user(
        &self,
        role: Role,
        email: &str,
        given_name: &str,
        family_name: &str,
    ) -> Result<User, ApiError>;

    /// Every member of the role's group.
    async fn list_users(&self, role: Role) -> Result<Vec<User>, ApiError>;

    async fn get_user(&self, username: &str) -> Result<Option<User>, ApiError>;

    /// The first role group the user belongs to.
    async fn get_user_role(&self, username: &str) -> Result<Option<Role>, ApiError>;

    /// Writes `set` and removes `delete`. Returns false when the user does not
    /// exist.
    async fn update_user(
        &self,
        username: &str,
        set: Vec<Attribute>,
        delete: Vec<String>,
    ) -> Result<bool, ApiError>;
}

pub struct CognitoIdentity {
    client: CognitoClient,
    user_pool_id: String,
}

impl CognitoIdentity {
    pub fn new(client: CognitoClient, user_pool_id: impl Into<String>) -> Self {
        Self {
            client,
            user_pool_id: user_pool_id.into(),
        }
    }
}

/// Any attribute write re-asserts `email_verified` so an email change never
/// locks the account out.
pub fn with_email_verified(mut attributes: Vec<Attribute>) -> Vec<Attribute> {
    if !attributes.is_empty() {
        attributes.retain(|attribute| attribute.name != "email_verified");
        attributes.push(Attribute::new("email_verified", "true"));
    }
    attributes
}

fn to_attribute_types(attributes: &[Attribute]) -> Result<Vec<AttributeType>, ApiError> {
    attributes
        .iter()
        .map(|attribute| {
            AttributeType::builder()
                .name(&attribute.name)
                .value(&attribute.value)
                .build()
                .map_err(ApiError::from)
        })
        .collect()
}

fn from_attribute_types(attributes: &[AttributeType]) -> Vec<Attribute> {
    attributes
        .iter()
        .map(|attribute| Attribute::new(attribute.name(), attribute.value().unwrap_or_default()))
        .collect()
}

fn to_chrono(date: &SmithyDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(date.secs(), date.subsec_nanos())
}

fn from_user_type(user: &UserType) -> User {
    User {
        username: user.username().unwrap_or_default().to_string(),
        attributes: from_attribute_types(user.attributes()),
        created_at: user.user_create_date().and_then(to_chrono),
    }
}

#[async_trait]
impl IdentityProvider for CognitoIdentity {
    async fn create_user(
        &self,
        role: Role,
        email: &str,
        given_name: &str,
        family_name: &str,
    ) -> Result<User, ApiError> {
        let attributes = to_attribute_types(&[
            Attribute::new("email", email),
            Attribute::new("email_verified", "true"),
            Attribute::new("given_name", given_name),
            Attribute::new("family_name", family_name),
        ])?;

        let created = self
            .client
            .admin_create_user()
            .user_pool_id(&self.user_pool_id)
            .username(email)
            .set_user_attributes(Some(attributes))
            .desired_delivery_mediums(DeliveryMediumType::Email)
            .send()
            .await
            .map_err(ApiError::from_sdk)?;

        let user = created
            .user()
            .map(from_user_type)
            .ok_or_else(|| ApiError::Internal("identity provider returned no user".into()))?;

        self.client
            .admin_add_user_to_group()
            .user_pool_id(&self.user_pool_id)
            .username(&user.username)
            .group_name(role.group_name())
            .send()
            .await
            .map_err(ApiError::from_sdk)?;

        tracing::info!("Created {} {}", role.group_name(), user.username);
        Ok(user)
    }

    async fn list_users(&self, role: Role) -> Result<Vec<User>, ApiError> {
        let mut users = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_users_in_group()
                .user_pool_id(&self.user_pool_id)
                .group_name(role.group_name())
                .limit(LIST_PAGE_SIZE)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(ApiError::from_sdk)?;

            users.extend(page.users().iter().map(from_user_type));

            match page.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(users)
    }

    async fn get_user(&self, username: &str) -> Result<Option<User>, ApiError> {
        let result = self
            .client
            .admin_get_user()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .send()
            .await;

        match result {
            Ok(output) => Ok(Some(User {
                username: output.username().to_string(),
                attributes: from_attribute_types(output.user_attributes()),
                created_at: output.user_create_date().and_then(to_chrono),
            })),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_user_not_found_exception()) =>
            {
                Ok(None)
            }
            Err(err) => Err(ApiError::from_sdk(err)),
        }
    }

    async fn get_user_role(&self, username: &str) -> Result<Option<Role>, ApiError> {
        let result = self
            .client
            .admin_list_groups_for_user()
            .user_pool_id(&self.user_pool_id)
            .username(username)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output
                .groups()
                .iter()
                .filter_map(|group| group.group_name())
                .find_map(Role::from_group_name)),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_user_not_found_exception()) =>
            {
                Ok(None)
            }
            Err(err) => Err(ApiError::from_sdk(err)),
        }
    }

    async fn update_user(
        &self,
        username: &str,
        set: Vec<Attribute>,
        delete: Vec<String>,
    ) -> Result<bool, ApiError> {
        let set = with_email_verified(set);

        if !set.is_empty() {
            let result = self
                .client
                .admin_update_user_attributes()
                .user_pool_id(&self.user_pool_id)
                .username(username)
                .set_user_attributes(Some(to_attribute_types(&set)?))
                .send()
                .await;

            match result {
                Ok(_) => {}
                Err(err)
                    if err
                        .as_service_error()
                        .is_some_and(|e| e.is_user_not_found_exception()) =>
                {
                    return Ok(false)
                }
                Err(err) => return Err(ApiError::from_sdk(err)),
            }
        }

        if !delete.is_empty() {
            let result = self
                .client
                .admin_delete_user_attributes()
                .user_pool_id(&self.user_pool_id)
                .username(username)
                .set_user_attribute_names(Some(delete))
                .send()
                .await;

            match result {
                Ok(_) => {}
                Err(err)
                    if err
                        .as_service_error()
                        .is_some_and(|e| e.is_user_not_found_exception()) =>
                {
                    return Ok(false)
                }
                Err(err) => return Err(ApiError::from_sdk(err)),
            }
        }

        Ok(true)
    }
}
