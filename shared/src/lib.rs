pub mod types;
pub mod attributes;
pub mod auth;
pub mod config;
pub mod error;
pub mod policy;
pub mod response;
pub mod serializers;
pub mod cognito;
pub mod dynamo;
pub mod s3;
pub mod users;
pub mod profiles;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

use cognito::IdentityProvider;
use dynamo::ProfileStore;
use s3::MediaStore;
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub identity: Arc<dyn IdentityProvider>,
    pub store: Arc<dyn ProfileStore>,
    pub media: Arc<dyn MediaStore>,
}

impl AppState {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn ProfileStore>,
        media: Arc<dyn MediaStore>,
    ) -> Arc<Self> {
        Arc::new(Self {
            identity,
            store,
            media,
        })
    }
}
