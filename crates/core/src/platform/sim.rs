use std::time::{Duration, Instant};

use anyhow::{bail, Result};

use crate::logger;
use crate::pattern::{MagicPattern, TestPattern};
use crate::settings::SimConfig;
use crate::types::*;
use super::{Platform, TestSurface};

const NANOS_PER_US: i64 = 1000;

enum Clock {
    Real(Instant),
    Virtual(i64),
}

/// In-memory screen with a test page (and optionally a native reference
/// window) that paint the test pattern and react to injected input.
pub struct SimulatedPlatform {
    config: SimConfig,
    clock: Clock,
    page: Option<SimPage>,
    reference: Option<SimPage>,
    captures: u64,
    releases: u64,
}

/// A window painting a test pattern whose counters follow the clock and the
/// input it received.
struct SimPage {
    magic: MagicPattern,
    mode: TestMode,
    origin: (u32, u32),
    shown_at: i64,
    latency_ns: i64,
    keystrokes: Vec<i64>,
    scrolls: Vec<i64>,
    reference: bool,
}

impl SimPage {
    fn new(magic: MagicPattern, mode: TestMode, origin: (u32, u32), shown_at: i64, latency_us: u64) -> Self {
        Self {
            magic,
            mode,
            origin,
            shown_at,
            latency_ns: latency_us as i64 * NANOS_PER_US,
            keystrokes: Vec::new(),
            scrolls: Vec::new(),
            reference: false,
        }
    }

    fn render(&self, now: i64, cfg: &SimConfig) -> TestPattern {
        let elapsed = (now - self.shown_at).max(0);
        let frame_ns = (cfg.frame_interval_us as i64 * NANOS_PER_US).max(1);

        let mut pattern = TestPattern::new(self.magic, self.mode);
        let css_frames = elapsed / frame_ns;
        let js_frames = match (cfg.jank_at_ms, self.reference) {
            (Some(at), false) => {
                let at = ms_to_ns(at);
                let frozen = (elapsed - at).clamp(0, ms_to_ns(cfg.jank_duration_ms));
                (elapsed - frozen) / frame_ns
            }
            _ => css_frames,
        };
        pattern.javascript_frames = (js_frames % 256) as u8;
        pattern.css_frames = (css_frames % 256) as u8;

        if !(cfg.drop_keystrokes && !self.reference) {
            let seen = self.keystrokes.iter().filter(|t| **t + self.latency_ns <= now).count();
            pattern.key_down_events = (seen % 256) as u8;
        }

        let anim_ns = cfg.scroll_animation_us as i64 * NANOS_PER_US;
        let step = cfg.scroll_step as i64;
        let scrolled: i64 = self
            .scrolls
            .iter()
            .map(|t| {
                let start = *t + self.latency_ns;
                if now < start {
                    0
                } else if anim_ns == 0 || now - start >= anim_ns {
                    step
                } else {
                    step * (now - start) / anim_ns
                }
            })
            .sum();
        pattern.scroll_position = (scrolled % 256) as u8;

        if !self.reference {
            if self.mode == TestMode::PauseTime && elapsed > ms_to_ns(cfg.pause_test_duration_ms) {
                pattern.test_mode = TestMode::PauseTimeFinished;
            }
            if let Some(after) = cfg.abort_after_ms {
                if elapsed >= ms_to_ns(after) {
                    pattern.test_mode = TestMode::Abort;
                }
            }
        }
        pattern
    }
}

impl SimulatedPlatform {
    pub fn new(config: SimConfig) -> Self {
        let clock = if config.virtual_clock { Clock::Virtual(0) } else { Clock::Real(Instant::now()) };
        Self {
            config,
            clock,
            page: None,
            reference: None,
            captures: 0,
            releases: 0,
        }
    }

    /// (captures taken, buffers released)
    pub fn buffer_counts(&self) -> (u64, u64) {
        (self.captures, self.releases)
    }

    pub fn reference_window_open(&self) -> bool {
        self.reference.is_some()
    }

    /// Input goes to the reference window while it is open, as it steals
    /// focus when shown.
    fn focused_page(&mut self) -> Option<&mut SimPage> {
        if self.reference.is_some() {
            self.reference.as_mut()
        } else {
            self.page.as_mut()
        }
    }

    fn tick(&mut self) {
        let step_us = self.config.capture_step_us;
        match &mut self.clock {
            Clock::Virtual(now) => *now += step_us as i64 * NANOS_PER_US,
            Clock::Real(_) => {
                if step_us > 0 {
                    std::thread::sleep(Duration::from_micros(step_us));
                }
            }
        }
    }
}

impl Platform for SimulatedPlatform {
    fn capture(&mut self, x: u32, y: u32, width: u32, height: u32) -> Option<PixelBuffer> {
        let (sw, sh) = (self.config.screen_width, self.config.screen_height);
        if x >= sw || y >= sh || width == 0 || height == 0 {
            logger::warn_p("sim", &format!("capture({}, {}, {}, {}) outside the screen", x, y, width, height));
            return None;
        }
        self.tick();
        let now = self.now_ns();
        let w = width.min(sw - x);
        let h = height.min(sh - y);
        let mut buf = PixelBuffer::black(w, h, w * 4 + self.config.row_padding, now);

        for page in [self.page.as_ref(), self.reference.as_ref()].into_iter().flatten() {
            let pattern = page.render(now, &self.config);
            pattern.paint(&mut buf, page.origin.0 as i64 - x as i64, page.origin.1 as i64 - y as i64);
        }
        if self.config.clear_alpha {
            for row in buf.data.chunks_mut(buf.stride as usize) {
                for a in row[..(w * 4) as usize].iter_mut().skip(3).step_by(4) {
                    *a = 0;
                }
            }
        }
        self.captures += 1;
        Some(buf)
    }

    fn release(&mut self, buffer: PixelBuffer) {
        self.releases += 1;
        drop(buffer);
    }

    fn send_keystroke(&mut self) -> Result<()> {
        let now = self.now_ns();
        let Some(page) = self.focused_page() else { bail!("no window to send keystroke to") };
        page.keystrokes.push(now);
        Ok(())
    }

    fn send_scroll(&mut self, x: i32, y: i32) -> Result<()> {
        let now = self.now_ns();
        let Some(page) = self.focused_page() else { bail!("no window to scroll at ({}, {})", x, y) };
        page.scrolls.push(now);
        Ok(())
    }

    fn now_ns(&self) -> i64 {
        match &self.clock {
            Clock::Real(start) => start.elapsed().as_nanos() as i64,
            Clock::Virtual(now) => *now,
        }
    }

    fn open_native_reference_window(&mut self, pattern: &TestPattern) -> Result<()> {
        if self.reference.is_some() {
            bail!("native reference window already open");
        }
        let mut page = SimPage::new(
            pattern.magic,
            pattern.test_mode,
            self.config.reference_origin,
            self.now_ns(),
            self.config.reference_latency_us,
        );
        page.reference = true;
        self.reference = Some(page);
        logger::info_p("sim", &format!("native reference window opened at {:?}", self.config.reference_origin));
        Ok(())
    }

    fn close_native_reference_window(&mut self) -> Result<()> {
        if self.reference.take().is_none() {
            bail!("native reference window not open");
        }
        logger::info_p("sim", "native reference window closed");
        Ok(())
    }
}

impl TestSurface for SimulatedPlatform {
    fn show_test_page(&mut self, mode: TestMode, magic: MagicPattern) {
        let now = self.now_ns();
        self.page = Some(SimPage::new(magic, mode, self.config.page_origin, now, self.config.key_latency_us));
        logger::info_p("sim", &format!("test page shown at {:?} in mode {:?}", self.config.page_origin, mode));
    }

    fn close_test_page(&mut self) {
        self.page = None;
    }
}
