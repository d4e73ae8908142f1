use clap::Parser;

#[derive(Parser)]
#[command(version, about = "Serve subscriptions fanned out across allowed SNI values", long_about = None)]
pub struct Args {
    #[arg(short, long, help = "Config file path (TOML)")]
    pub config: Option<String>,

    #[arg(short, long, help = "Listen address, overrides the config")]
    pub listen: Option<String>,

    #[arg(short, long, help = "Emit trace log")]
    pub verbose: bool,
}
