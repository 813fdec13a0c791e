//! Common code shared between `detect_server` and `img_sender`.
pub mod protocol;
