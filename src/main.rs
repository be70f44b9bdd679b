use std::{net::SocketAddr, sync::Arc};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ecomm_api::{
    app::build_router,
    config::AppConfig,
    db::{create_pool, orm_from_pool, run_migrations},
    state::AppState,
    utils::{
        mailer::SmtpMailer, payment::RazorpayClient, storage::S3Store, token::JwtKeys,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ecomm_api=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let pool = create_pool(&config.database_url, config.database_max_connections).await?;
    run_migrations(&pool).await?;

    let state = AppState {
        orm: Arc::new(orm_from_pool(pool)),
        jwt: Arc::new(JwtKeys::from_config(&config.jwt)),
        public_url: config.public_url.clone(),
        mailer: Arc::new(SmtpMailer::new(&config.smtp)?),
        storage: Arc::new(S3Store::from_config(&config.s3).await),
        payments: Arc::new(RazorpayClient::new(&config.razorpay)),
    };

    let app = build_router(state, config.body_limit_bytes);

    let addr = SocketAddr::from((config.host.parse::<std::net::IpAddr>()?, config.port));
    tracing::info!("listening on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
