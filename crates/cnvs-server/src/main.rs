use cnvs_server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env()?;
    cnvs_server::init_tracing(&config.log_level);

    cnvs_server::run(config).await
}
