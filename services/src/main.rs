use foodgram_services::{
    config::Config,
    database::{self, PgStorage},
    media::FsFileStorage,
    routes, telemetry,
    users::PgUserStorage,
};
use std::net::{IpAddr, SocketAddr};
use tracing::info;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

const BUILD_DATE: &str = env!("BUILD_DATE");
const BUILD_COMMIT: &str = env!("BUILD_COMMIT");
const BUILD_BRANCH: &str = env!("BUILD_BRANCH");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine outside local development
    let _ = dotenvy::dotenv();

    let config: Config = Config::init()?;
    telemetry::init_tracing(&config)?;

    print_build_info();
    info!(
        environment = %config.environment(),
        server_addr = %config.server_addr(),
        port = %config.port(),
        media_root = %config.media_root(),
        "Configuration loaded"
    );

    let pool = database::create_pool(&config).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied");

    let sql_storage = PgStorage::new(pool);
    let user_storage = PgUserStorage::new(sql_storage.clone());
    let file_storage = FsFileStorage::new(config.media_root())?;

    let route = routes(sql_storage, user_storage, file_storage, config.clone());

    let addr = SocketAddr::from((config.server_addr().parse::<IpAddr>()?, config.port()));
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, route).await?;

    Ok(())
}

fn print_build_info() {
    info!("===========================================");
    info!("  Foodgram Services");
    info!("===========================================");
    info!("Build Date:   {}", BUILD_DATE);
    info!("Build Commit: {}", BUILD_COMMIT);
    info!("Build Branch: {}", BUILD_BRANCH);
    info!("===========================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_info_constants_exist() {
        assert!(!BUILD_DATE.is_empty());
        assert!(!BUILD_COMMIT.is_empty());
        assert!(!BUILD_BRANCH.is_empty());
    }
}
