use anyhow::Result;
use clap::Parser;
use docrag::pipeline;
use docrag::Config;

#[derive(Parser, Debug)]
#[command(name = "docrag")]
#[command(about = "Convert, index and query documents against an embedded vector store")]
struct Args {
    /// Rebuild the vector index even if one already exists
    #[arg(short, long)]
    force_rebuild: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(
        env_logger::Env::default()
            .filter_or("RUST_LOG", "info")
    ).init();

    let args = Args::parse();

    log::info!("Starting docrag pipeline");

    // Load configuration (fatal on missing credentials or bad values)
    let config = Config::load()?;
    log::info!("Configuration loaded successfully");
    log::info!("Database path: {}", config.db_path().display());
    log::info!("Converted docs dir: {}", config.converted_dir().display());

    let answer = pipeline::run(&config, args.force_rebuild).await?;

    println!("{}", answer);

    Ok(())
}
