use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use env_logger::TimestampPrecision;
use img_sender::client::post_image;

#[derive(Parser, Debug)]
#[clap(author, version)]
struct Args {
    /// Address of the detection server to send to
    #[clap(long, default_value = "127.0.0.1:5001")]
    address: String,

    /// Image files to detect objects in
    #[clap(required = true)]
    images: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::builder()
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();

    let client = reqwest::Client::new();
    let mut failures = 0;

    for path in args.images.iter() {
        match post_image(&client, &args.address, path).await {
            Ok(response) => {
                log::info!(
                    "{}: {}x{}, {} objects",
                    path.display(),
                    response.dimension.width,
                    response.dimension.height,
                    response.results.len()
                );
                for (idx, entry) in response.results.iter() {
                    log::info!("  #{} class {} at {:?}", idx, entry.class_name, entry.bbox);
                }
                for count in response.class_counts() {
                    log::info!("  class {}: {}", count.class_name, count.quantity);
                }
            }
            Err(err) => {
                log::error!("{}: {:#}", path.display(), err);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{} of {} images failed", failures, args.images.len());
    }

    Ok(())
}
