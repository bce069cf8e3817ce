use crate::attributes::remove_attributes;
use crate::auth::Caller;
use crate::error::ApiError;
use crate::policy::{self, Operation, Resource, Target};
use crate::response;
use crate::serializers::user::{admin_resource, caseworker_resource, descriptor, host_resource};
use crate::serializers::validation::{validate_new_user, validate_user_changes};
use crate::serializers::{self, deserialize_body, Resource as Serialized};
use crate::types::{Document, ProfileKey, ProfileTable, Role, User, UserStats};
use crate::AppState;
use lambda_http::{http::StatusCode, Body, Response};
use serde_json::Value;

fn owned_by(record: &Document, field: &str, username: &str) -> bool {
    record.get(field).and_then(Value::as_str) == Some(username)
}

/// Pairs a user with whatever its role embeds.
fn embed(role: Role, user: &User, profiles: &[Document]) -> Serialized {
    match role {
        Role::Admin => admin_resource(user),
        Role::Host => host_resource(
            user,
            profiles
                .iter()
                .find(|profile| owned_by(profile, "host", &user.username))
                .cloned(),
        ),
        Role::Caseworker => caseworker_resource(
            user,
            profiles
                .iter()
                .filter(|profile| owned_by(profile, "caseworker", &user.username))
                .cloned()
                .collect(),
        ),
    }
}

/// Profiles embedded under users of `role`, for a whole listing.
async fn all_profiles(state: &AppState, role: Role) -> Result<Vec<Document>, ApiError> {
    match role {
        Role::Admin => Ok(Vec::new()),
        Role::Host => state.store.scan(ProfileTable::HostProfiles).await,
        Role::Caseworker => state.store.scan(ProfileTable::ResidentProfiles).await,
    }
}

/// Profiles embedded under one user.
async fn profiles_of(state: &AppState, role: Role, username: &str) -> Result<Vec<Document>, ApiError> {
    match role {
        Role::Admin => Ok(Vec::new()),
        Role::Host => Ok(state
            .store
            .get(&ProfileKey::Host(username.to_string()))
            .await?
            .into_iter()
            .collect()),
        Role::Caseworker => {
            state
                .store
                .query(ProfileTable::ResidentProfiles, username)
                .await
        }
    }
}

/// `POST /{role}s`
pub async fn create_user(
    state: &AppState,
    caller: &Caller,
    role: Role,
    body: &[u8],
) -> Result<Response<Body>, ApiError> {
    policy::require(caller, Resource::users(role), Operation::Create, Target::Collection)?;

    let hash = deserialize_body(descriptor(role), body)?;
    let new_user = validate_new_user(&hash)?;

    let user = state
        .identity
        .create_user(
            role,
            &new_user.email,
            &new_user.given_name,
            &new_user.family_name,
        )
        .await?;

    let document = serializers::serialize_one(descriptor(role), embed(role, &user, &[]));
    response::jsonapi(StatusCode::CREATED, &document)
}

/// `GET /{role}s`
pub async fn list_users(
    state: &AppState,
    caller: &Caller,
    role: Role,
) -> Result<Response<Body>, ApiError> {
    let decision =
        policy::require(caller, Resource::users(role), Operation::List, Target::Collection)?;

    let mut users = state.identity.list_users(role).await?;
    let profiles = all_profiles(state, role).await?;

    let resources = users
        .iter_mut()
        .map(|user| {
            remove_attributes(&mut user.attributes, decision.redactions());
            embed(role, user, &profiles)
        })
        .collect();

    let document = serializers::serialize_many(descriptor(role), resources);
    response::jsonapi(StatusCode::OK, &document)
}

/// `GET /{role}s/{id}`. A user outside the role's group is not found.
pub async fn get_user(
    state: &AppState,
    caller: &Caller,
    role: Role,
    id: &str,
) -> Result<Response<Body>, ApiError> {
    let decision = policy::require(caller, Resource::users(role), Operation::Get, Target::Owner(id))?;

    let mut user = state.identity.get_user(id).await?.ok_or(ApiError::NotFound)?;
    if state.identity.get_user_role(id).await? != Some(role) {
        return Err(ApiError::NotFound);
    }
    remove_attributes(&mut user.attributes, decision.redactions());

    let profiles = profiles_of(state, role, &user.username).await?;
    let document = serializers::serialize_one(descriptor(role), embed(role, &user, &profiles));
    response::jsonapi(StatusCode::OK, &document)
}

/// `PATCH /{role}s/{id}`
pub async fn update_user(
    state: &AppState,
    caller: &Caller,
    role: Role,
    id: &str,
    body: &[u8],
) -> Result<Response<Body>, ApiError> {
    policy::require(caller, Resource::users(role), Operation::Update, Target::Owner(id))?;

    let hash = deserialize_body(descriptor(role), body)?;
    let changes = validate_user_changes(hash)?;

    if state.identity.get_user_role(id).await? != Some(role) {
        return Err(ApiError::NotFound);
    }
    if !state
        .identity
        .update_user(id, changes.set, changes.delete)
        .await?
    {
        return Err(ApiError::NotFound);
    }

    tracing::info!("Updated {} {}", role.group_name(), id);
    response::empty(StatusCode::NO_CONTENT)
}

/// `GET /userStats`
pub async fn user_stats(state: &AppState, caller: &Caller) -> Result<Response<Body>, ApiError> {
    policy::require(caller, Resource::UserStats, Operation::View, Target::Collection)?;

    let stats = UserStats {
        hosts: state.identity.list_users(Role::Host).await?.len(),
        residents: state.store.count(ProfileTable::ResidentProfiles).await?,
    };
    response::json(StatusCode::OK, &stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_state, FakeIdentityProvider, FakeProfileStore};
    use serde_json::json;
    use std::sync::Arc;

    fn body(response: &Response<Body>) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    fn payload(kind: &str, attributes: Value) -> Vec<u8> {
        serde_json::to_vec(&json!({ "data": { "type": kind, "attributes": attributes } })).unwrap()
    }

    fn doc(value: Value) -> Document {
        value.as_object().unwrap().clone()
    }

    struct World {
        state: Arc<AppState>,
        identity: Arc<FakeIdentityProvider>,
        store: Arc<FakeProfileStore>,
        admin: Caller,
        host: Caller,
        caseworker: Caller,
    }

    fn world() -> World {
        let (state, identity, store) = test_state();
        let admin = identity.add_user(Role::Admin, &[("email", "admin@b.com")]);
        let host = identity.add_user(
            Role::Host,
            &[
                ("email", "host@b.com"),
                ("given_name", "Hal"),
                ("phone_number", "+12068675309"),
            ],
        );
        let caseworker = identity.add_user(Role::Caseworker, &[("email", "cw@b.com")]);
        World {
            state,
            identity,
            store,
            admin: Caller::new(admin, Role::Admin),
            host: Caller::new(host, Role::Host),
            caseworker: Caller::new(caseworker, Role::Caseworker),
        }
    }

    #[tokio::test]
    async fn test_admin_creates_host() {
        let w = world();
        let response = create_user(
            &w.state,
            &w.admin,
            Role::Host,
            &payload(
                "hosts",
                json!({ "email": "a@b.com", "givenName": "A", "familyName": "B" }),
            ),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), 201);
        let created = body(&response);
        assert_eq!(created["data"]["type"], "hosts");
        assert_eq!(created["data"]["attributes"]["email"], "a@b.com");
        assert_eq!(created["data"]["attributes"]["givenName"], "A");

        let username = created["data"]["id"].as_str().unwrap();
        assert!(w.identity.usernames(Role::Host).contains(&username.to_string()));
        assert_eq!(
            w.identity.attribute(username, "email_verified").as_deref(),
            Some("true")
        );
    }

    #[tokio::test]
    async fn test_only_admins_create_users() {
        let w = world();
        let body = payload(
            "hosts",
            json!({ "email": "a@b.com", "givenName": "A", "familyName": "B" }),
        );
        for caller in [&w.host, &w.caseworker] {
            let err = create_user(&w.state, caller, Role::Host, &body).await.unwrap_err();
            assert!(matches!(err, ApiError::Forbidden));
        }
        assert_eq!(w.identity.usernames(Role::Host).len(), 1);
    }

    #[tokio::test]
    async fn test_create_reports_every_invalid_field() {
        let w = world();
        let err = create_user(
            &w.state,
            &w.admin,
            Role::Caseworker,
            &payload("caseworkers", json!({ "email": "bad" })),
        )
        .await
        .unwrap_err();

        match err {
            ApiError::Validation(messages) => assert_eq!(
                messages,
                vec![
                    "Email is not a valid email",
                    "Given name can't be blank",
                    "Family name can't be blank"
                ]
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_with_registered_email_propagates_provider_error() {
        let w = world();
        let err = create_user(
            &w.state,
            &w.admin,
            Role::Host,
            &payload(
                "hosts",
                json!({ "email": "host@b.com", "givenName": "A", "familyName": "B" }),
            ),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status(), 400);
        assert!(matches!(err, ApiError::Backend { ref code, .. } if code == "UsernameExistsException"));
    }

    #[tokio::test]
    async fn test_list_hosts_redacts_email_for_caseworkers() {
        let w = world();

        let as_admin = body(&list_users(&w.state, &w.admin, Role::Host).await.unwrap());
        assert_eq!(as_admin["data"][0]["attributes"]["email"], "host@b.com");
        assert_eq!(as_admin["data"][0]["attributes"]["phoneNumber"], "2068675309");

        let as_caseworker = body(&list_users(&w.state, &w.caseworker, Role::Host).await.unwrap());
        let items = as_caseworker["data"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        for item in items {
            assert!(item["attributes"].get("email").is_none());
            assert_eq!(item["attributes"]["givenName"], "Hal");
        }
    }

    #[tokio::test]
    async fn test_created_host_is_listed_per_role() {
        let w = world();
        create_user(
            &w.state,
            &w.admin,
            Role::Host,
            &payload(
                "hosts",
                json!({ "email": "a@b.com", "givenName": "A", "familyName": "B" }),
            ),
        )
        .await
        .unwrap();

        let as_admin = body(&list_users(&w.state, &w.admin, Role::Host).await.unwrap());
        assert!(as_admin["data"]
            .as_array()
            .unwrap()
            .iter()
            .any(|item| item["attributes"]["email"] == "a@b.com"));

        let as_caseworker = body(&list_users(&w.state, &w.caseworker, Role::Host).await.unwrap());
        let created = as_caseworker["data"]
            .as_array()
            .unwrap()
            .iter()
            .find(|item| item["attributes"]["givenName"] == "A")
            .unwrap();
        assert!(created["attributes"].get("email").is_none());
    }

    #[tokio::test]
    async fn test_list_hosts_embeds_profiles() {
        let w = world();
        w.store.insert(
            ProfileKey::Host(w.host.username.clone()),
            doc(json!({ "greeting": "Welcome", "visible": 1 })),
        );

        let listed = body(&list_users(&w.state, &w.admin, Role::Host).await.unwrap());
        assert_eq!(
            listed["data"][0]["relationships"]["profile"]["data"],
            json!({ "type": "host-profiles", "id": w.host.username })
        );
        assert_eq!(listed["included"][0]["attributes"]["greeting"], "Welcome");
        assert_eq!(listed["included"][0]["attributes"]["visible"], true);
    }

    #[tokio::test]
    async fn test_list_permissions() {
        let w = world();
        for (caller, role) in [
            (&w.host, Role::Host),
            (&w.host, Role::Caseworker),
            (&w.host, Role::Admin),
            (&w.caseworker, Role::Caseworker),
            (&w.caseworker, Role::Admin),
        ] {
            let err = list_users(&w.state, caller, role).await.unwrap_err();
            assert!(matches!(err, ApiError::Forbidden), "{:?} {:?}", caller, role);
        }
        for role in Role::ALL {
            assert!(list_users(&w.state, &w.admin, role).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_list_caseworkers_embeds_their_residents() {
        let w = world();
        let other = w.identity.add_user(Role::Caseworker, &[("email", "other@b.com")]);
        w.store.insert(
            ProfileKey::Resident {
                caseworker: w.caseworker.username.clone(),
                id: "r1".to_string(),
            },
            doc(json!({ "firstName": "Ann" })),
        );
        w.store.insert(
            ProfileKey::Resident {
                caseworker: other.clone(),
                id: "r2".to_string(),
            },
            doc(json!({ "firstName": "Bo" })),
        );

        let listed = body(&list_users(&w.state, &w.admin, Role::Caseworker).await.unwrap());
        let items = listed["data"].as_array().unwrap();
        let mine = items
            .iter()
            .find(|item| item["id"] == w.caseworker.username.as_str())
            .unwrap();
        assert_eq!(
            mine["relationships"]["residents"]["data"],
            json!([{ "type": "resident-profiles", "id": format!("{}:r1", w.caseworker.username) }])
        );
        assert_eq!(listed["included"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_get_host() {
        let w = world();
        let id = w.host.username.clone();

        let as_self = body(&get_user(&w.state, &w.host, Role::Host, &id).await.unwrap());
        assert_eq!(as_self["data"]["attributes"]["email"], "host@b.com");

        let as_caseworker = body(&get_user(&w.state, &w.caseworker, Role::Host, &id).await.unwrap());
        assert!(as_caseworker["data"]["attributes"].get("email").is_none());

        let other = w.identity.add_user(Role::Host, &[("email", "h2@b.com")]);
        let err = get_user(&w.state, &w.host, Role::Host, &other).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));
    }

    #[tokio::test]
    async fn test_get_user_in_another_group_is_not_found() {
        let w = world();
        let err = get_user(&w.state, &w.admin, Role::Caseworker, &w.host.username)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound));

        let err = get_user(&w.state, &w.admin, Role::Host, "nobody").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[tokio::test]
    async fn test_caseworker_gets_self_with_residents() {
        let w = world();
        w.store.insert(
            ProfileKey::Resident {
                caseworker: w.caseworker.username.clone(),
                id: "r1".to_string(),
            },
            doc(json!({ "firstName": "Ann" })),
        );

        let id = w.caseworker.username.clone();
        let fetched = body(&get_user(&w.state, &w.caseworker, Role::Caseworker, &id).await.unwrap());
        assert_eq!(fetched["included"][0]["attributes"]["firstName"], "Ann");

        let other = w.identity.add_user(Role::Caseworker, &[("email", "c2@b.com")]);
        let err = get_user(&w.state, &w.caseworker, Role::Caseworker, &other)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));
    }

    #[tokio::test]
    async fn test_update_stores_prefixed_phone_number() {
        let w = world();
        let id = w.host.username.clone();
        let response = update_user(
            &w.state,
            &w.host,
            Role::Host,
            &id,
            &payload("hosts", json!({ "phoneNumber": "2065550100", "secret": "x" })),
        )
        .await
        .unwrap();

        assert_eq!(response.status(), 204);
        assert_eq!(
            w.identity.attribute(&id, "phone_number").as_deref(),
            Some("+12065550100")
        );
        assert_eq!(w.identity.attribute(&id, "secret"), None);

        let fetched = body(&get_user(&w.state, &w.host, Role::Host, &id).await.unwrap());
        assert_eq!(fetched["data"]["attributes"]["phoneNumber"], "2065550100");
    }

    #[tokio::test]
    async fn test_update_clears_blank_attributes() {
        let w = world();
        let id = w.host.username.clone();
        update_user(
            &w.state,
            &w.admin,
            Role::Host,
            &id,
            &payload("hosts", json!({ "phoneNumber": "", "familyName": "Hale" })),
        )
        .await
        .unwrap();

        assert_eq!(w.identity.attribute(&id, "phone_number"), None);
        assert_eq!(w.identity.attribute(&id, "family_name").as_deref(), Some("Hale"));
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_values() {
        let w = world();
        let id = w.host.username.clone();
        let err = update_user(
            &w.state,
            &w.host,
            Role::Host,
            &id,
            &payload("hosts", json!({ "phoneNumber": "555", "email": "nope" })),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(ref messages) if messages.len() == 2));
        assert_eq!(
            w.identity.attribute(&id, "phone_number").as_deref(),
            Some("+12068675309")
        );
    }

    #[tokio::test]
    async fn test_update_permissions_and_existence() {
        let w = world();
        let err = update_user(
            &w.state,
            &w.caseworker,
            Role::Host,
            &w.host.username,
            &payload("hosts", json!({ "givenName": "X" })),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));

        let err = update_user(
            &w.state,
            &w.admin,
            Role::Host,
            "nobody",
            &payload("hosts", json!({ "givenName": "X" })),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound));

        let err = update_user(
            &w.state,
            &w.admin,
            Role::Admin,
            &w.host.username,
            &payload("admins", json!({ "givenName": "X" })),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
        assert_eq!(w.identity.attribute(&w.host.username, "given_name").as_deref(), Some("Hal"));
    }

    #[tokio::test]
    async fn test_user_stats() {
        let w = world();
        w.store.insert(
            ProfileKey::Resident {
                caseworker: w.caseworker.username.clone(),
                id: "r1".to_string(),
            },
            Document::new(),
        );

        let stats = body(&user_stats(&w.state, &w.admin).await.unwrap());
        assert_eq!(stats, json!({ "hosts": 1, "residents": 1 }));

        for caller in [&w.host, &w.caseworker] {
            assert!(matches!(
                user_stats(&w.state, caller).await.unwrap_err(),
                ApiError::Forbidden
            ));
        }
    }
}
