use lambda_http::{http::Method, Body, Error, Request, Response};
use matchmaking_shared::{
    auth::Caller, error::ApiError, profiles, response, s3, types::Role, users, AppState,
};
use std::borrow::Cow;
use std::sync::Arc;

/// Main Lambda handler - resolves the caller and routes to the shared handlers
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    tracing::info!("API Lambda invoked - Method: {} Path: {}", method, path);

    let caller = Caller::from_request(&event);
    let result = route(&state, caller, method, path, event.body()).await;

    Ok(result.unwrap_or_else(|err| {
        match &err {
            ApiError::Backend { .. } | ApiError::Internal(_) => {
                tracing::error!("{} {} failed: {}", method, path, err)
            }
            _ => tracing::info!("{} {} -> {}", method, path, err.status()),
        }
        err.into_response()
    }))
}

/// Dispatches on `(method, path segments)`. Only preflight and the health
/// check are served without a caller.
pub(crate) async fn route(
    state: &AppState,
    caller: Result<Caller, ApiError>,
    method: &Method,
    path: &str,
    body: &[u8],
) -> Result<Response<Body>, ApiError> {
    if method == Method::OPTIONS {
        return response::preflight();
    }

    let segments = match path_segments(path) {
        Ok(segments) => segments,
        Err(err) => {
            caller?;
            return Err(err);
        }
    };
    let parts: Vec<&str> = segments.iter().map(|s| s.as_ref()).collect();
    if method == Method::GET && parts.is_empty() {
        return response::health();
    }

    let caller = caller?;
    match (method, parts.as_slice()) {
        (&Method::GET, ["userStats"]) => users::user_stats(state, &caller).await,
        (&Method::POST, ["mediaUpload"]) => s3::media_upload(state, &caller, body).await,

        // Host profiles
        (&Method::POST, ["host-profiles"]) => {
            profiles::create_host_profile(state, &caller, body).await
        }
        (&Method::PATCH, ["host-profiles", id]) => {
            profiles::update_host_profile(state, &caller, id, body).await
        }
        (&Method::DELETE, ["host-profiles", id]) => {
            profiles::delete_host_profile(state, &caller, id).await
        }

        // Resident profiles
        (&Method::POST, ["resident-profiles"]) => {
            profiles::create_resident_profile(state, &caller, body).await
        }
        (&Method::PATCH, ["resident-profiles", id]) => {
            profiles::update_resident_profile(state, &caller, id, body).await
        }
        (&Method::DELETE, ["resident-profiles", id]) => {
            profiles::delete_resident_profile(state, &caller, id).await
        }

        // Users: /admins, /hosts, /caseworkers
        (_, [collection, rest @ ..]) => match (Role::from_group_name(collection), rest) {
            (Some(role), []) if method == Method::POST => {
                users::create_user(state, &caller, role, body).await
            }
            (Some(role), []) if method == Method::GET => {
                users::list_users(state, &caller, role).await
            }
            (Some(role), [id]) if method == Method::GET => {
                users::get_user(state, &caller, role, id).await
            }
            (Some(role), [id]) if method == Method::PATCH => {
                users::update_user(state, &caller, role, id, body).await
            }
            _ => not_found(method, path),
        },

        _ => not_found(method, path),
    }
}

/// Splits the raw path and percent-decodes each segment. Splitting first keeps
/// an encoded `/` inside its segment.
fn path_segments(path: &str) -> Result<Vec<Cow<'_, str>>, ApiError> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            urlencoding::decode(segment)
                .map_err(|_| ApiError::BadRequest(format!("Malformed path segment: {}", segment)))
        })
        .collect()
}

fn not_found(method: &Method, path: &str) -> Result<Response<Body>, ApiError> {
    tracing::warn!("No route for {} {}", method, path);
    Err(ApiError::NotFound)
}
