use crate::error::ApiError;
use lambda_http::{http::StatusCode, Body, Response};
use serde::Serialize;

pub const JSON_API: &str = "application/vnd.api+json";

/// Plain JSON body.
pub fn json<T: Serialize>(status: StatusCode, value: &T) -> Result<Response<Body>, ApiError> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(value)?.into())?)
}

/// JSON:API document.
pub fn jsonapi(status: StatusCode, document: &serde_json::Value) -> Result<Response<Body>, ApiError> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", JSON_API)
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(document)?.into())?)
}

pub fn empty(status: StatusCode) -> Result<Response<Body>, ApiError> {
    Ok(Response::builder()
        .status(status)
        .header("Access-Control-Allow-Origin", "*")
        .body(Body::Empty)?)
}

/// Answer to a CORS preflight request.
pub fn preflight() -> Result<Response<Body>, ApiError> {
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header(
            "Access-Control-Allow-Methods",
            "GET, POST, PATCH, DELETE, OPTIONS",
        )
        .header(
            "Access-Control-Allow-Headers",
            "Content-Type, Authorization",
        )
        .body(Body::Empty)?)
}

pub fn health() -> Result<Response<Body>, ApiError> {
    json(StatusCode::OK, &serde_json::json!({ "status": "ok" }))
}
