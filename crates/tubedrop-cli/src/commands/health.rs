//! `tubedrop health`.

use anyhow::anyhow;
use tubedrop_api::HealthResponse;

use crate::client::{AppContext, CliError, CliResult, classify_problem};

pub(crate) async fn handle_health(ctx: &AppContext) -> CliResult<()> {
    let health = fetch_health(ctx).await?;
    let rendered = serde_json::to_string_pretty(&health)
        .map_err(|err| CliError::failure(anyhow!("failed to render health: {err}")))?;
    println!("{rendered}");
    Ok(())
}

pub(crate) async fn fetch_health(ctx: &AppContext) -> CliResult<HealthResponse> {
    let response = ctx
        .client
        .get(ctx.endpoint("/health")?)
        .send()
        .await
        .map_err(|err| CliError::failure(anyhow!("request to /health failed: {err}")))?;
    if !response.status().is_success() {
        return Err(classify_problem(response).await);
    }
    response
        .json::<HealthResponse>()
        .await
        .map_err(|err| CliError::failure(anyhow!("failed to parse health response: {err}")))
}
