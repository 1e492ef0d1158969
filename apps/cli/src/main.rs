use anyhow::Context;
use clap::Parser;
use loft_cli::Cli;
use loft_domain::config::LoftConfig;
use loft_kernel::config::load_config;
use loft_logger::{LevelFilter, Logger};

#[loft_runtime::main(memory_efficient)]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg: LoftConfig =
        load_config(cli.config.as_deref()).context("Critical: Configuration is malformed")?;

    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        cfg.log.level.parse().with_context(|| format!("Invalid log level '{}'", cfg.log.level))?
    };
    let mut logger =
        Logger::builder().name(env!("CARGO_PKG_NAME")).stderr(true).level(level).json(cfg.log.json);
    if let Some(dir) = &cfg.log.dir {
        logger = logger.path(dir);
    }
    let _log = logger.init()?;

    loft_cli::run(cli.command, &cfg, &mut tokio::io::stdout()).await
}
