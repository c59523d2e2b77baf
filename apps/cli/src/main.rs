use clap::Parser;

use commit_resume::cli::{self, Cli};

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    let code = cli::main_with(args.mode).await;
    std::process::exit(code);
}
