use serde::{Deserialize, Serialize};

pub const NANOS_PER_MS: i64 = 1_000_000;

/// Milliseconds from configuration to nanoseconds, saturating instead of
/// overflowing on absurd values.
pub fn ms_to_ns(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX).saturating_mul(NANOS_PER_MS)
}

/// Pixels in the full test pattern (magic + data).
pub const PATTERN_PIXELS: usize = 8;
pub const PATTERN_BYTES: usize = PATTERN_PIXELS * 4;
/// Pixels in the identifying part of the pattern.
pub const MAGIC_PIXELS: usize = 4;
pub const MAGIC_BYTES: usize = MAGIC_PIXELS * 4;
/// Hex length of the magic pattern on the wire (alpha omitted).
pub const HEX_PATTERN_LEN: usize = MAGIC_PIXELS * 3 * 2;

/// Raw screenshot pixel data (BGRA)
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
    /// Capture time, monotonic within this process only.
    pub time_ns: i64,
}

impl PixelBuffer {
    /// A buffer filled with opaque black.
    pub fn black(width: u32, height: u32, stride: u32, time_ns: i64) -> Self {
        let mut data = vec![0u8; (stride * height) as usize];
        for row in data.chunks_mut(stride as usize) {
            for px in row[..(width * 4) as usize].chunks_mut(4) {
                px[3] = 255;
            }
        }
        Self { data, width, height, stride, time_ns }
    }

    /// Byte offset of pixel (x, y).
    pub fn offset(&self, x: u32, y: u32) -> usize {
        (y * self.stride + x * 4) as usize
    }
}

/// Test mode byte painted by the test page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestMode {
    JavascriptLatency,
    ScrollLatency,
    PauseTime,
    PauseTimeFinished,
    NativeReference,
    Abort,
    Unknown(u8),
}

impl TestMode {
    pub fn from_byte(b: u8) -> Self {
        match b {
            1 => Self::JavascriptLatency,
            2 => Self::ScrollLatency,
            3 => Self::PauseTime,
            4 => Self::PauseTimeFinished,
            5 => Self::NativeReference,
            6 => Self::Abort,
            other => Self::Unknown(other),
        }
    }

    pub fn to_byte(self) -> u8 {
        match self {
            Self::JavascriptLatency => 1,
            Self::ScrollLatency => 2,
            Self::PauseTime => 3,
            Self::PauseTimeFinished => 4,
            Self::NativeReference => 5,
            Self::Abort => 6,
            Self::Unknown(b) => b,
        }
    }
}

/// One decoded sample of the test pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    pub screenshot_time: i64,
    pub javascript_frames: u8,
    pub key_down_events: u8,
    pub css_frames: u8,
    pub scroll_position: u8,
    pub test_mode: TestMode,
}

/// Final numbers of one successful run. Serializes with the keys the test
/// page expects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyReport {
    #[serde(rename = "keyDownLatencyMs")]
    pub key_down_latency_ms: f64,
    #[serde(rename = "scrollLatencyMs")]
    pub scroll_latency_ms: f64,
    /// Symmetric (upper + lower) / 2 scroll estimate, reported next to the
    /// historical `upper + lower / 2` value until the latter is settled.
    #[serde(rename = "scrollLatencyMidpointMs")]
    pub scroll_latency_midpoint_ms: f64,
    #[serde(rename = "maxJSPauseTimeMs")]
    pub max_js_pause_ms: f64,
    #[serde(rename = "maxCssPauseTimeMs")]
    pub max_css_pause_ms: f64,
    #[serde(rename = "maxScrollPauseTimeMs")]
    pub max_scroll_pause_ms: f64,
}

/// Test the front-end asks the page to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    KeyLatency,
    ScrollLatency,
    PauseTime,
    NativeReference,
}

impl TestKind {
    pub const ALL: [TestKind; 4] = [
        TestKind::KeyLatency,
        TestKind::ScrollLatency,
        TestKind::PauseTime,
        TestKind::NativeReference,
    ];

    pub fn mode(self) -> TestMode {
        match self {
            Self::KeyLatency => TestMode::JavascriptLatency,
            Self::ScrollLatency => TestMode::ScrollLatency,
            Self::PauseTime => TestMode::PauseTime,
            Self::NativeReference => TestMode::NativeReference,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::KeyLatency => "keydown latency",
            Self::ScrollLatency => "scroll latency",
            Self::PauseTime => "pause time (jank)",
            Self::NativeReference => "native reference",
        }
    }

    /// Parse the `--mode` command line value.
    pub fn from_arg(s: &str) -> Option<Self> {
        match s {
            "js" | "key" => Some(Self::KeyLatency),
            "scroll" => Some(Self::ScrollLatency),
            "pause" | "jank" => Some(Self::PauseTime),
            "native" => Some(Self::NativeReference),
            _ => None,
        }
    }
}

/// Outcome of one finished run, as shown by the TUI.
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub kind: TestKind,
    pub pattern_hex: String,
    pub outcome: Result<LatencyReport, String>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Running,
}

/// Command from TUI to orchestrator
pub enum Command {
    Run(TestKind),
    Quit,
}
