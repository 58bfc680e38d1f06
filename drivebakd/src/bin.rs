use clap::Parser;
use drivebak::{loc, path::FsPathBuf, Config};

#[derive(Parser)]
#[command(name = "drivebakd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to an alternative configuration file
    #[clap(long, short = 'c')]
    config: Option<FsPathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config_file = match cli.config {
        Some(path) => path,
        None => loc::config_file()?,
    };
    if !config_file.exists() {
        anyhow::bail!("No such config file: {config_file}");
    }
    log::info!("found config file: {config_file}");

    let config = Config::load_from_file(&config_file).await?;
    log::trace!("loaded config: {config:?}");

    drivebakd::start(config).await
}
