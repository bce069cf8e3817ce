use std::env;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("unknown STAGE {0:?} (expected dev, stage or prod)")]
    UnknownStage(String),
}

/// Deployment stage, used to pick the public front-end domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Dev,
    Stage,
    Prod,
}

impl Stage {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value {
            "dev" => Ok(Stage::Dev),
            "stage" => Ok(Stage::Stage),
            "prod" => Ok(Stage::Prod),
            other => Err(ConfigError::UnknownStage(other.to_string())),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        env::var("STAGE")
            .ok()
            .map_or(Ok(Stage::default()), |value| Stage::parse(&value))
    }

    pub fn domain(self) -> &'static str {
        match self {
            Stage::Prod => "matchmaking.the-block-project.org",
            Stage::Stage => "matchmaking-stage.the-block-project.org",
            Stage::Dev => "matchmaking-dev.the-block-project.org",
        }
    }
}

/// Everything the API lambda reads from its environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub user_pool_id: String,
    pub host_profiles_table: String,
    pub resident_profiles_table: String,
    pub media_bucket: String,
    /// Local DynamoDB endpoint, only set in development.
    pub dynamo_endpoint: Option<String>,
    pub stage: Stage,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        Ok(Self {
            user_pool_id: required("USER_POOL")?,
            host_profiles_table: required("HOST_PROFILES_TABLE")?,
            resident_profiles_table: required("RESIDENT_PROFILES_TABLE")?,
            media_bucket: required("MEDIA_BUCKET")?,
            dynamo_endpoint: lookup("DYNAMO_ENDPOINT").filter(|value| !value.is_empty()),
            stage: lookup("STAGE").map_or(Ok(Stage::default()), |value| Stage::parse(&value))?,
        })
    }
}
