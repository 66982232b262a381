use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    nxsence::cli::run(nxsence::cli::Cli::parse()).await
}
