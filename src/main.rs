use clap::Parser;
use hyperprime::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli::build_config(&cli.global) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };

    if let Some(directive) = config.log_level.directive() {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directive)),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    if let Err(e) = cli::run(cli, config).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
