use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use matchmaking_shared::config::Stage;
use tracing_subscriber::EnvFilter;

mod messages;

use messages::CustomMessageEvent;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .without_time()
        .init();

    let stage = Stage::from_env()?;

    run(service_fn(move |event: LambdaEvent<CustomMessageEvent>| async move {
        function_handler(event, stage).await
    }))
    .await
}

async fn function_handler(
    event: LambdaEvent<CustomMessageEvent>,
    stage: Stage,
) -> Result<CustomMessageEvent, Error> {
    let mut payload = event.payload;
    tracing::info!("Custom message trigger: {}", payload.trigger_source);

    if !messages::customize(&mut payload, stage) {
        tracing::info!("Passing {} through unchanged", payload.trigger_source);
    }
    Ok(payload)
}
