// src/main.rs

use anyhow::Context as _;
use poise::serenity_prelude as serenity;
use sfdesk::config::{BotConfig, DatabaseConfig, LogFormat};
use sfdesk::discord::{self, Data};
use sfdesk::pipelines;
use sfdesk::router::Router;
use sfdesk::services::order_store::MySqlOrderStore;
use sfdesk::state::AppState;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlSslMode};
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE);
  match format {
    LogFormat::Pretty => builder.init(),
    LogFormat::Json => builder.json().init(),
  }
}

async fn connect_database(db: &DatabaseConfig) -> anyhow::Result<MySqlPool> {
  let options = MySqlConnectOptions::new()
    .host(&db.host)
    .port(db.port)
    .username(&db.user)
    .password(&db.password)
    .database(&db.name)
    .ssl_mode(MySqlSslMode::Preferred);

  let pool = MySqlPoolOptions::new()
    .max_connections(db.max_connections)
    .connect_with(options)
    .await
    .with_context(|| format!("failed to connect to MySQL at {}:{}", db.host, db.port))?;
  Ok(pool)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let config = BotConfig::from_env()?;
  init_tracing(config.log_format);
  tracing::info!("Starting sfdesk...");
  config.log_summary();

  let pool = match connect_database(&config.database).await {
    Ok(pool) => {
      tracing::info!("Successfully connected to the database.");
      pool
    }
    Err(e) => {
      tracing::error!(error = %e, "Failed to connect to the database.");
      return Err(e);
    }
  };

  let token = config.discord_token.clone();
  let app_state = AppState::new(Arc::new(MySqlOrderStore::new(pool)), config);
  pipelines::register_all_flows(&app_state.flows);
  let router = Router::new(app_state);

  let framework = poise::Framework::builder()
    .options(poise::FrameworkOptions {
      commands: discord::commands::all(),
      event_handler: |ctx, event, framework, data| Box::pin(discord::events::handle_event(ctx, event, framework, data)),
      on_error: |error| Box::pin(discord::events::on_error(error)),
      ..Default::default()
    })
    .setup(move |ctx, ready, framework| {
      Box::pin(async move {
        match poise::builtins::register_globally(ctx, &framework.options().commands).await {
          Ok(()) => tracing::info!("Slash commands registered globally."),
          Err(e) => tracing::error!(error = %e, "Failed to register slash commands."),
        }
        Ok(Data {
          router,
          bot_user_id: ready.user.id,
        })
      })
    })
    .build();

  let intents = serenity::GatewayIntents::GUILDS
    | serenity::GatewayIntents::GUILD_MESSAGES
    | serenity::GatewayIntents::MESSAGE_CONTENT
    | serenity::GatewayIntents::DIRECT_MESSAGES;

  let mut client = serenity::ClientBuilder::new(token, intents)
    .framework(framework)
    .await
    .context("failed to build the Discord client")?;

  tracing::info!("Bot is now running.");
  client.start().await.context("Discord client stopped with an error")?;
  Ok(())
}
