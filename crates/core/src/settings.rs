use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::TestKind;

/// Timing knobs of the measurement loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Counted transitions needed before a latency test succeeds.
    pub latency_measurements: u32,
    pub event_response_timeout_ms: u64,
    /// Quiet period after which a scroll is considered settled.
    pub scroll_settle_ms: u64,
    pub scroll_settle_timeout_ms: u64,
    pub test_timeout_ms: u64,
    /// Upper end of the random delay before each injected event.
    pub input_jitter_ms: u64,
    pub pause_scroll_interval_ms: u64,
    pub slow_screenshot_ms: u64,
    pub min_lower_bound_ms: u64,
    /// Sleep between polling iterations; 0 yields.
    pub poll_interval_ms: u64,
    /// Scroll events are aimed this many pixels right of and below the pattern.
    pub scroll_offset: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            latency_measurements: 50,
            event_response_timeout_ms: 4000,
            scroll_settle_ms: 100,
            scroll_settle_timeout_ms: 1000,
            test_timeout_ms: 40_000,
            input_jitter_ms: 16,
            pause_scroll_interval_ms: 17,
            slow_screenshot_ms: 20,
            min_lower_bound_ms: 5,
            poll_interval_ms: 0,
            scroll_offset: 40,
        }
    }
}

/// Behaviour of the simulated screen and test page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    pub screen_width: u32,
    pub screen_height: u32,
    /// Extra bytes at the end of every captured row.
    pub row_padding: u32,
    /// Captures report alpha 0, as some capture backends do.
    pub clear_alpha: bool,
    /// Use a virtual clock that only moves when a capture is taken.
    pub virtual_clock: bool,
    /// Time one capture takes: added to the virtual clock, or slept on the
    /// real one.
    pub capture_step_us: u64,
    pub page_origin: (u32, u32),
    pub reference_origin: (u32, u32),
    pub frame_interval_us: u64,
    pub key_latency_us: u64,
    pub reference_latency_us: u64,
    pub scroll_step: u8,
    pub scroll_animation_us: u64,
    /// Frames stop advancing for `jank_duration_ms` starting at `jank_at_ms`.
    pub jank_at_ms: Option<u64>,
    pub jank_duration_ms: u64,
    pub pause_test_duration_ms: u64,
    pub abort_after_ms: Option<u64>,
    /// The page ignores injected keystrokes.
    pub drop_keystrokes: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            screen_width: 640,
            screen_height: 480,
            row_padding: 0,
            clear_alpha: false,
            virtual_clock: false,
            capture_step_us: 1000,
            page_origin: (120, 80),
            reference_origin: (500, 400),
            frame_interval_us: 16_667,
            key_latency_us: 30_000,
            reference_latency_us: 8_000,
            scroll_step: 7,
            scroll_animation_us: 50_000,
            jank_at_ms: Some(800),
            jank_duration_ms: 120,
            pause_test_duration_ms: 2000,
            abort_after_ms: None,
            drop_keystrokes: false,
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineConfig,
    pub simulation: SimConfig,
    pub last_test: Option<TestKind>,
}

impl Settings {
    pub fn load(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
