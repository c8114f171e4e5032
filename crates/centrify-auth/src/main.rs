use centrify_auth::config::load_config;
use centrify_auth::{Authenticator, CentrifyBackend, MemoryStorage, WriteOperation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_tracing() {
    let default_directives = "centrify_auth=info,centrify_login=info,reqwest=warn";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let registry = tracing_subscriber::registry().with(env_filter);
    let layer = fmt::layer().with_target(true).with_level(true);

    registry.with(layer).init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    initialize_tracing();

    let app = load_config()?;

    let authenticator = Authenticator::new()?.with_source_header(app.source_header.as_str());
    let backend = CentrifyBackend::new(MemoryStorage::new())?.with_authenticator(authenticator);

    let config = backend
        .write_config(WriteOperation::Create, app.centrify)
        .await?;
    tracing::info!(service_url = %config.service_url, "tenant configured");

    let alias = backend.alias_lookahead(&app.login.username)?;
    tracing::info!(alias = %alias.name, "logging in");

    let response = backend.login(&app.login).await?;

    // The access token stays out of the printed summary.
    let summary = serde_json::json!({
        "display_name": response.display_name,
        "policies": response.policies,
        "group_aliases": response.group_alias_names().collect::<Vec<_>>(),
        "metadata": response.metadata,
        "lease": response.lease,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
