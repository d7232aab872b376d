#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::style)]

use clap::Parser;
use singbox_sub::cli::Args;
use singbox_sub::generator::Generator;
use tracing::Level;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            Level::TRACE
        } else {
            Level::INFO
        })
        .init();

    if let Err(e) = run(args).await {
        tracing::error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    tracing::info!(
        "singbox-sub {}: loading generator config from {}",
        singbox_sub::get_version(),
        args.generator
    );

    let generator = Generator::load(&args.generator).await?;

    generator.generate_to_file(args.output.as_deref()).await?;

    tracing::info!("Outbound generation complete!");
    Ok(())
}
