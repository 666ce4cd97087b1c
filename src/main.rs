use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = correlog::cli::Cli::parse();
    if let Err(e) = correlog::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
