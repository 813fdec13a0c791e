//! Detection server binary.
//!
use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use clap::Parser;
use detect_server::{
    build_router,
    config::Args,
    draw::load_font,
    nn::YoloModel,
    utils::resolve_model_path,
    AppState,
};
use env_logger::TimestampPrecision;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logger
    env_logger::builder()
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();

    // Load the model once; it is shared read-only between all requests
    let model_path = resolve_model_path(&args).await?;
    log::info!("Loading model {}", model_path.display());
    let model = YoloModel::new(&model_path, args.input_size)?;

    let font = match load_font(&args.font) {
        Ok(font) => Some(font),
        Err(err) => {
            log::warn!("{:#}; dashboard labels will not be drawn", err);
            None
        }
    };

    let state = Arc::new(AppState::new(Arc::new(model), font));
    let app = build_router(state, args.max_upload_bytes);

    // Serve HTTP server
    let addr: SocketAddr = args.server_address.parse()?;
    log::info!("Serving on http://{}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
