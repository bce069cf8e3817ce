use aws_sdk_dynamodb::config::http::HttpResponse;
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::operation::RequestId;
use lambda_http::{
    http::{header, HeaderValue, StatusCode},
    Body, Response,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthenticated(String),
    #[error("caller may not perform this operation")]
    Forbidden,
    #[error("validation failed: {}", .0.join(", "))]
    Validation(Vec<String>),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("resource not found")]
    NotFound,
    #[error("resource already exists")]
    Conflict,
    #[error("{code}: {message} (request {request_id})")]
    Backend {
        status: u16,
        code: String,
        message: String,
        request_id: String,
    },
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorTitle<'a> {
    title: &'a str,
}

#[derive(Serialize)]
struct ErrorList<'a> {
    errors: Vec<ErrorTitle<'a>>,
}

#[derive(Serialize)]
struct BackendBody<'a> {
    code: &'a str,
    message: &'a str,
}

impl ApiError {
    /// Converts an AWS SDK failure. The SDK crates share the smithy error
    /// type, so this serves Cognito, DynamoDB and S3 alike.
    pub fn from_sdk<E>(err: SdkError<E, HttpResponse>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    {
        let status = err.raw_response().map(|raw| raw.status().as_u16());
        let code = err.code().map(str::to_string);
        let message = err.message().map(str::to_string);
        let request_id = err.request_id().map(str::to_string);

        match (status, code, message, request_id) {
            (Some(status), Some(code), Some(message), Some(request_id)) => ApiError::Backend {
                status,
                code,
                message,
                request_id,
            },
            _ => ApiError::Internal(DisplayErrorContext(&err).to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Backend { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Renders the error the way clients expect it.
    pub fn into_response(self) -> Response<Body> {
        let status = self.status();
        let (content_type, body) = match &self {
            ApiError::Unauthenticated(message) => ("text/plain", Body::from(message.clone())),
            ApiError::Forbidden | ApiError::NotFound | ApiError::Conflict => {
                ("text/plain", Body::Empty)
            }
            ApiError::Validation(messages) => (
                "application/vnd.api+json",
                json_body(&ErrorList {
                    errors: messages.iter().map(|title| ErrorTitle { title }).collect(),
                }),
            ),
            ApiError::BadRequest(message) => (
                "application/vnd.api+json",
                json_body(&ErrorList {
                    errors: vec![ErrorTitle { title: message }],
                }),
            ),
            ApiError::Backend { code, message, .. } => {
                ("application/json", json_body(&BackendBody { code, message }))
            }
            ApiError::Internal(message) => (
                "application/json",
                json_body(&BackendBody {
                    code: "InternalError",
                    message,
                }),
            ),
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        );
        response
    }
}

fn json_body<T: Serialize>(value: &T) -> Body {
    serde_json::to_string(value).unwrap_or_default().into()
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(format!("failed to encode response: {}", err))
    }
}

impl From<lambda_http::http::Error> for ApiError {
    fn from(err: lambda_http::http::Error) -> Self {
        ApiError::Internal(format!("failed to build response: {}", err))
    }
}

impl From<aws_sdk_cognitoidentityprovider::error::BuildError> for ApiError {
    fn from(err: aws_sdk_cognitoidentityprovider::error::BuildError) -> Self {
        ApiError::Internal(format!("invalid identity provider request: {}", err))
    }
}
