use crate::auth::Caller;
use crate::error::ApiError;
use crate::policy::{self, Operation, Resource, Target};
use crate::response;
use crate::serializers::host_profile::HOST_PROFILE;
use crate::serializers::resident_profile::{resident_key, RESIDENT_PROFILE};
use crate::serializers::{deserialize_body, serialize_one, Resource as Serialized};
use crate::types::{CreateOutcome, ProfileKey};
use crate::AppState;
use chrono::{SecondsFormat, Utc};
use lambda_http::{http::StatusCode, Body, Response};
use serde_json::Value;

// ========== HOST PROFILES ==========

/// `POST /host-profiles`. A host has at most one profile.
pub async fn create_host_profile(
    state: &AppState,
    caller: &Caller,
    body: &[u8],
) -> Result<Response<Body>, ApiError> {
    policy::require(
        caller,
        Resource::HostProfiles,
        Operation::Create,
        Target::Owner(&caller.username),
    )?;
    let hash = deserialize_body(&HOST_PROFILE, body)?;

    let key = ProfileKey::Host(caller.username.clone());
    match state.store.create(&key, hash).await? {
        CreateOutcome::Created(profile) => {
            tracing::info!("Created host profile for {}", caller.username);
            response::jsonapi(
                StatusCode::CREATED,
                &serialize_one(&HOST_PROFILE, Serialized::new(profile)),
            )
        }
        CreateOutcome::AlreadyExists => Err(ApiError::Conflict),
    }
}

/// `PATCH /host-profiles/{id}`
pub async fn update_host_profile(
    state: &AppState,
    caller: &Caller,
    id: &str,
    body: &[u8],
) -> Result<Response<Body>, ApiError> {
    policy::require(caller, Resource::HostProfiles, Operation::Update, Target::Owner(id))?;
    let hash = deserialize_body(&HOST_PROFILE, body)?;

    let profile = state
        .store
        .update(&ProfileKey::Host(id.to_string()), hash)
        .await?
        .ok_or(ApiError::NotFound)?;
    response::jsonapi(
        StatusCode::OK,
        &serialize_one(&HOST_PROFILE, Serialized::new(profile)),
    )
}

/// `DELETE /host-profiles/{id}`
pub async fn delete_host_profile(
    state: &AppState,
    caller: &Caller,
    id: &str,
) -> Result<Response<Body>, ApiError> {
    policy::require(caller, Resource::HostProfiles, Operation::Delete, Target::Owner(id))?;

    if !state.store.delete(&ProfileKey::Host(id.to_string())).await? {
        return Err(ApiError::NotFound);
    }
    tracing::info!("Deleted host profile for {}", id);
    response::empty(StatusCode::NO_CONTENT)
}

// ========== RESIDENT PROFILES ==========
// Resident profiles are always addressed within the caller's own partition.

/// `POST /resident-profiles`
pub async fn create_resident_profile(
    state: &AppState,
    caller: &Caller,
    body: &[u8],
) -> Result<Response<Body>, ApiError> {
    policy::require(
        caller,
        Resource::ResidentProfiles,
        Operation::Create,
        Target::Owner(&caller.username),
    )?;
    let mut hash = deserialize_body(&RESIDENT_PROFILE, body)?;
    hash.insert(
        "creationTime".to_string(),
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
    );

    let key = ProfileKey::new_resident(&caller.username);
    match state.store.create(&key, hash).await? {
        CreateOutcome::Created(profile) => response::jsonapi(
            StatusCode::CREATED,
            &serialize_one(&RESIDENT_PROFILE, Serialized::new(profile)),
        ),
        CreateOutcome::AlreadyExists => Err(ApiError::Conflict),
    }
}

/// `PATCH /resident-profiles/{id}`
pub async fn update_resident_profile(
    state: &AppState,
    caller: &Caller,
    id: &str,
    body: &[u8],
) -> Result<Response<Body>, ApiError> {
    policy::require(
        caller,
        Resource::ResidentProfiles,
        Operation::Update,
        Target::Owner(&caller.username),
    )?;
    let hash = deserialize_body(&RESIDENT_PROFILE, body)?;
    let key = resident_key(&caller.username, id).ok_or(ApiError::NotFound)?;

    let profile = state
        .store
        .update(&key, hash)
        .await?
        .ok_or(ApiError::NotFound)?;
    response::jsonapi(
        StatusCode::OK,
        &serialize_one(&RESIDENT_PROFILE, Serialized::new(profile)),
    )
}

/// `DELETE /resident-profiles/{id}`
pub async fn delete_resident_profile(
    state: &AppState,
    caller: &Caller,
    id: &str,
) -> Result<Response<Body>, ApiError> {
    policy::require(
        caller,
        Resource::ResidentProfiles,
        Operation::Delete,
        Target::Owner(&caller.username),
    )?;
    let key = resident_key(&caller.username, id).ok_or(ApiError::NotFound)?;

    if !state.store.delete(&key).await? {
        return Err(ApiError::NotFound);
    }
    response::empty(StatusCode::NO_CONTENT)
}
