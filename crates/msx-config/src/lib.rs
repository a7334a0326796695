// Input pipeline configuration (delay, dead zones, grab, burst correction)

pub mod input_config;

pub use input_config::{
    BurstConfig, DEFAULT_BURST_THRESHOLD_MS, DEFAULT_DEAD_ZONE, InputConfig,
    LEGACY_BURST_THRESHOLD_MS, MAX_INPUT_DELAY_SECS, clamp_input_delay,
};
