#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::style)]

use clap::Parser;
use sni_fanout::cli::Args;
use sni_fanout::generator::{Generator, GeneratorConfig};
use sni_fanout::logging::init_logging;
use sni_fanout::server;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match GeneratorConfig::load(args.config.as_deref()).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let _guard = match init_logging(&config.log, args.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(args, config).await {
        tracing::error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args, mut config: GeneratorConfig) -> anyhow::Result<()> {
    if let Some(listen) = args.listen {
        config.listen = listen;
        config.validate()?;
    }
    tracing::info!(
        "Upstream subscriptions: {}",
        config.full_subscription_url()
    );

    let generator = Generator::new(config)?;
    server::serve(generator).await
}
