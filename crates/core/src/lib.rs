pub mod types;
pub mod error;
pub mod pattern;
pub mod locate;
pub mod stats;
pub mod engine;
pub mod platform;
pub mod orchestrator;
pub mod settings;
pub mod logger;
pub mod sleep;

#[cfg(feature = "debug-capture")]
pub mod debug_capture;

pub use engine::measure_latency;
pub use error::{ErrorClass, LatencyError};
pub use pattern::{decode_hex, encode_hex, MagicPattern, TestPattern};
