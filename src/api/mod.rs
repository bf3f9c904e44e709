//! Public HTTP surface of the scoring service.

pub mod http;

pub use http::{router, serve, ApiState};
