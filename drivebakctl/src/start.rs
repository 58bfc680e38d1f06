use drivebak::{loc, path::FsPathBuf, Config};

#[derive(clap::Args)]
pub struct Args {
    /// Path to an alternative configuration file
    #[clap(long, short = 'c')]
    config: Option<FsPathBuf>,
}

pub async fn main(args: Args) -> anyhow::Result<()> {
    let config_file = match args.config {
        Some(path) => path,
        None => loc::config_file()?,
    };
    if !config_file.exists() {
        anyhow::bail!("No such config file: {config_file}. Run `drivebakctl new` first.");
    }
    log::info!("found config file: {config_file}");

    let config = Config::load_from_file(&config_file).await?;
    drivebakd::start(config).await
}
