//! Typed client for the venue `/info` REST endpoint.

mod info_client;

pub use info_client::{InfoClient, InfoRequest};
