//! Typed parameters for the three public entry points, with the documented
//! defaults baked in as `Default` impls, and an optional TOML loader for
//! callers that want to drive a session from a config file (in the style of
//! `ObsidianConfig`/`OnyxConfig`: `thiserror` for the read/parse split,
//! `serde` + `toml` for the format).

mod agc;
mod loader;
mod params;

pub use agc::AgcMode;
pub use loader::ConfigError;
pub use params::{DuplexParams, RxParams, TxParams};
