//! Client sending images to the detection server.
pub mod client;
