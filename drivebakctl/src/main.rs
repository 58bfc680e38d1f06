use clap::Parser;

mod new;
mod start;

#[derive(Parser)]
#[command(name = "drivebakctl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Configure a new periodic backup
    New(new::Args),
    /// Run the backup loop with the saved configuration
    Start(start::Args),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::New(args) => new::main(args).await,
        Commands::Start(args) => start::main(args).await,
    }
}
