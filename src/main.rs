use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use std::path::Path;

use followerbot_rs::browser::WebDriver;
use followerbot_rs::config::Config;
use followerbot_rs::engine::bot::Bot;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "followerbot.toml")]
    config: String,
    /// Comma-separated task list replacing the configured one.
    #[arg(short, long)]
    tasks: Option<String>,
    /// Seed for batch sizes and delays.
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = if Path::new(&args.config).exists() {
        Config::load(&args.config)?
    } else {
        let cfg = Config::default();
        cfg.save(&args.config)?;
        info!("Wrote default configuration to {}", args.config);
        cfg
    };

    config.apply_env_overrides();
    if let Some(tasks) = &args.tasks {
        config.override_tasks(tasks);
    }
    config.validate()?;

    let browser = WebDriver::connect(&config.browser)
        .await
        .with_context(|| format!("no WebDriver session at {}", config.browser.webdriver_url))?;

    let mut bot = Bot::new(config, browser, args.seed);
    let result = bot.run().await;
    bot.quit().await;

    if let Err(e) = &result {
        error!("Run stopped: {}", e);
    }
    result?;
    Ok(())
}
