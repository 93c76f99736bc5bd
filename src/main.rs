use anyhow::Result;
use checkmate_bot::{logger, App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载 .env
    dotenvy::dotenv().ok();

    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logger::init(config.verbose_logging);

    config.validate()?;

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
