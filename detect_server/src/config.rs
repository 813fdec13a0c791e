//! Command line and environment configuration of the server.
//!
use std::path::PathBuf;

use clap::Parser;

use crate::nn::DEFAULT_INPUT_SIZE;

/// Font used for class labels when none is configured.
pub const DEFAULT_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf";

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about = "Object detection over HTTP and in the browser")]
pub struct Args {
    /// Address to serve the HTTP endpoints on
    #[clap(long, env = "DETECT_SERVER_ADDRESS", default_value = "0.0.0.0:5001")]
    pub server_address: String,

    /// Path of the detection model in ONNX format
    #[clap(long, env = "DETECT_MODEL", default_value = "weights/best.onnx")]
    pub model: PathBuf,

    /// URL to download the model from if it is not found at `--model`
    #[clap(long, env = "DETECT_MODEL_URL")]
    pub model_url: Option<String>,

    /// Side length of the square model input
    #[clap(
        long,
        env = "DETECT_INPUT_SIZE",
        default_value_t = DEFAULT_INPUT_SIZE,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub input_size: u32,

    /// TrueType font for the labels drawn on the dashboard
    #[clap(long, env = "DETECT_FONT", default_value = DEFAULT_FONT)]
    pub font: PathBuf,

    /// Upper limit for the size of request bodies in bytes
    #[clap(long, env = "DETECT_MAX_UPLOAD_BYTES", default_value_t = 32 * 1024 * 1024)]
    pub max_upload_bytes: usize,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["detect_server"]).unwrap();

        assert_eq!(args.server_address, "0.0.0.0:5001");
        assert_eq!(args.model, PathBuf::from("weights/best.onnx"));
        assert_eq!(args.model_url, None);
        assert_eq!(args.input_size, 640);
        assert_eq!(args.font, PathBuf::from(DEFAULT_FONT));
        assert_eq!(args.max_upload_bytes, 32 * 1024 * 1024);
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "detect_server",
            "--server-address",
            "127.0.0.1:8080",
            "--model",
            "/tmp/yolov8n.onnx",
            "--model-url",
            "https://example.com/yolov8n.onnx",
            "--input-size",
            "320",
            "--max-upload-bytes",
            "1024",
        ])
        .unwrap();

        assert_eq!(args.server_address, "127.0.0.1:8080");
        assert_eq!(args.model, PathBuf::from("/tmp/yolov8n.onnx"));
        assert_eq!(
            args.model_url.as_deref(),
            Some("https://example.com/yolov8n.onnx")
        );
        assert_eq!(args.input_size, 320);
        assert_eq!(args.max_upload_bytes, 1024);
    }

    #[test]
    fn test_rejects_invalid_input_size() {
        assert!(Args::try_parse_from(["detect_server", "--input-size", "big"]).is_err());
        assert!(Args::try_parse_from(["detect_server", "--input-size", "0"]).is_err());
    }
}
