use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::Client as S3Client;
use lambda_http::{run, service_fn, tracing, Error, Request};
use matchmaking_shared::{
    cognito::CognitoIdentity, config::Config, dynamo::DynamoProfileStore, s3::S3Media, AppState,
};
use std::sync::Arc;

mod http_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let config = Config::from_env()?;
    tracing::info!("Starting API for stage {:?}", config.stage);

    // Initialize AWS clients once at startup
    let aws_config = aws_config::load_from_env().await;

    // Local DynamoDB (optional endpoint)
    let dynamo_client = match &config.dynamo_endpoint {
        Some(endpoint) => {
            let dynamo_config = aws_sdk_dynamodb::config::Builder::from(&aws_config)
                .endpoint_url(endpoint)
                .build();
            DynamoClient::from_conf(dynamo_config)
        }
        None => DynamoClient::new(&aws_config),
    };

    let state = AppState::new(
        Arc::new(CognitoIdentity::new(
            CognitoClient::new(&aws_config),
            config.user_pool_id,
        )),
        Arc::new(DynamoProfileStore::new(
            dynamo_client,
            config.host_profiles_table,
            config.resident_profiles_table,
        )),
        Arc::new(S3Media::new(S3Client::new(&aws_config), config.media_bucket)),
    );

    run(service_fn(move |event: Request| {
        let state = Arc::clone(&state);
        async move { http_handler::function_handler(event, state).await }
    }))
    .await
}
