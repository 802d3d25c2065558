use anyhow::Result;
use clap::Parser;
use indexer::driver::{run, Options};
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let start = Instant::now();
    let opts = Options::parse();
    tracing::debug!(?opts, "parsed options");
    run(&opts)?;
    println!("Elapsed: {:.6} seconds", start.elapsed().as_secs_f64());
    Ok(())
}
