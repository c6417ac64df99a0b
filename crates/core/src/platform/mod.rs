pub mod sim;

use anyhow::Result;

use crate::logger;
use crate::pattern::{MagicPattern, TestPattern};
use crate::settings::SimConfig;
use crate::types::*;

/// Screen capture, input injection and timing, as needed by the engine.
pub trait Platform: Send {
    /// Capture a screen region. Width and height are clamped to the screen,
    /// so `u32::MAX` captures everything right of / below (x, y).
    fn capture(&mut self, x: u32, y: u32, width: u32, height: u32) -> Option<PixelBuffer>;

    /// Hand a captured buffer back to the platform.
    fn release(&mut self, buffer: PixelBuffer) {
        drop(buffer);
    }

    /// Key down + key up of the test key to the focused window.
    fn send_keystroke(&mut self) -> Result<()>;

    /// Move the pointer to (x, y) and scroll down one notch.
    fn send_scroll(&mut self, x: i32, y: i32) -> Result<()>;

    /// Nanoseconds since an arbitrary point fixed for this process.
    fn now_ns(&self) -> i64;

    fn open_native_reference_window(&mut self, pattern: &TestPattern) -> Result<()>;
    fn close_native_reference_window(&mut self) -> Result<()>;
}

/// Something that can put the test page on screen, the part a browser plays
/// for a real run.
pub trait TestSurface {
    fn show_test_page(&mut self, mode: TestMode, magic: MagicPattern);
    fn close_test_page(&mut self);
}

/// A platform that can also display the test page.
pub trait Workbench: Platform + TestSurface {}

impl<T: Platform + TestSurface> Workbench for T {}

/// Create the platform for this process. Only the simulated screen is
/// built in; OS capture backends plug in through `Platform`.
pub fn create_platform(config: &SimConfig) -> Box<dyn Workbench> {
    logger::register_prefix("engine", logger::COLOR_BLUE);
    logger::register_prefix("sim", logger::COLOR_GRAY);
    logger::info_p(
        "sim",
        &format!(
            "simulated screen {}x{}, {} clock",
            config.screen_width,
            config.screen_height,
            if config.virtual_clock { "virtual" } else { "real" }
        ),
    );
    Box::new(sim::SimulatedPlatform::new(config.clone()))
}
