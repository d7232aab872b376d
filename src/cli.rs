use clap::Parser;

#[derive(Parser)]
#[command(version, about = "Decode share links into sing-box outbounds", long_about = None)]
pub struct Args {
    #[arg(short, long, help = "Generator config file path")]
    pub generator: String,

    #[arg(short, long, help = "Emit debug log")]
    pub verbose: bool,

    #[arg(short, long, help = "Output path, overrides the generator config")]
    pub output: Option<String>,
}
