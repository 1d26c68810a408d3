use serde::{Deserialize, Serialize};

/// AGC mode token accepted by the external process's `-agc_mode` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgcMode {
    Manual,
    FastAttack,
    SlowAttack,
    Hybrid,
}

impl Default for AgcMode {
    fn default() -> Self {
        AgcMode::Manual
    }
}

impl AgcMode {
    pub fn as_token(&self) -> &'static str {
        match self {
            AgcMode::Manual => "manual",
            AgcMode::FastAttack => "fast_attack",
            AgcMode::SlowAttack => "slow_attack",
            AgcMode::Hybrid => "hybrid",
        }
    }
}
