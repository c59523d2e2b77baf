//! Collect-only entry point: writes the commit document and stops.

use commit_resume::cli::{self, Mode};

#[tokio::main]
async fn main() {
    let code = cli::main_with(Some(Mode::Collect)).await;
    std::process::exit(code);
}
