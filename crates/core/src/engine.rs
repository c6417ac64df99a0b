use crate::error::LatencyError;
use crate::locate;
use crate::logger;
use crate::pattern::{self, MagicPattern, TestPattern};
use crate::platform::Platform;
use crate::settings::EngineConfig;
use crate::sleep;
use crate::stats::ChannelStatistic;
use crate::types::*;

type Result<T> = std::result::Result<T, LatencyError>;

/// Locate `magic` on screen and run one full latency test against the page
/// painting it, injecting input through `platform`.
///
/// The run is strictly sequential: every sample is captured and folded into
/// the statistics before the engine reacts to it, which the bound
/// computation in [`ChannelStatistic::update`] relies on.
pub fn measure_latency<P: Platform + ?Sized>(
    platform: &mut P,
    config: &EngineConfig,
    magic: &MagicPattern,
) -> Result<LatencyReport> {
    let mut test = LatencyTest { platform, config };
    test.run(magic, 0)
}

struct LatencyTest<'a, P: Platform + ?Sized> {
    platform: &'a mut P,
    config: &'a EngineConfig,
}

/// The four tracked counters of one run.
struct Channels {
    javascript_frames: ChannelStatistic,
    key_down_events: ChannelStatistic,
    css_frames: ChannelStatistic,
    scroll: ChannelStatistic,
}

impl Channels {
    fn seed(m: &Measurement, config: &EngineConfig) -> Self {
        let stat = |name, value| {
            ChannelStatistic::new(name, value, m.screenshot_time)
                .with_slow_screenshot_filter(config.slow_screenshot_ms, config.min_lower_bound_ms)
        };
        Self {
            javascript_frames: stat("javascript_frames", m.javascript_frames),
            key_down_events: stat("key_down_events", m.key_down_events),
            css_frames: stat("css_frames", m.css_frames),
            scroll: stat("scroll", m.scroll_position),
        }
    }

    /// Feed one sample to every channel. Returns whether the scroll position
    /// changed.
    fn update(&mut self, m: &Measurement, previous_screenshot_time: i64) -> bool {
        let t = m.screenshot_time;
        self.javascript_frames.update(m.javascript_frames, t, previous_screenshot_time);
        self.key_down_events.update(m.key_down_events, t, previous_screenshot_time);
        self.css_frames.update(m.css_frames, t, previous_screenshot_time);
        self.scroll.update(m.scroll_position, t, previous_screenshot_time)
    }

    fn report(&self) -> LatencyReport {
        LatencyReport {
            key_down_latency_ms: self.key_down_events.midpoint_ms(),
            // Historical formula: only the lower bound is halved.
            scroll_latency_ms: self.scroll.upper_bound_ms() + self.scroll.lower_bound_ms() / 2.0,
            scroll_latency_midpoint_ms: self.scroll.midpoint_ms(),
            max_js_pause_ms: self.javascript_frames.max_lower_bound_ms(),
            max_css_pause_ms: self.css_frames.max_lower_bound_ms(),
            max_scroll_pause_ms: self.scroll.max_lower_bound_ms(),
        }
    }
}

impl<'a, P: Platform + ?Sized> LatencyTest<'a, P> {
    fn run(&mut self, magic: &MagicPattern, depth: u32) -> Result<LatencyReport> {
        let (x, y) = self.locate(magic)?;
        logger::info_p(
            "engine",
            &format!("found pattern {} at ({}, {})", pattern::encode_hex(magic), x, y),
        );

        let first = self.read(x, y, magic).ok_or(LatencyError::PatternUnreadable)?;
        if first.test_mode == TestMode::NativeReference {
            return self.run_native_reference(magic, depth);
        }
        let report = self.poll(x, y, magic, first)?;
        logger::info_p(
            "engine",
            &format!(
                "key down {:.2} ms, scroll {:.2} ms, max pause js {:.2} ms / css {:.2} ms / scroll {:.2} ms",
                report.key_down_latency_ms,
                report.scroll_latency_ms,
                report.max_js_pause_ms,
                report.max_css_pause_ms,
                report.max_scroll_pause_ms
            ),
        );
        Ok(report)
    }

    /// Full-screen capture and search for the pattern.
    fn locate(&mut self, magic: &MagicPattern) -> Result<(u32, u32)> {
        let screen = self
            .platform
            .capture(0, 0, u32::MAX, u32::MAX)
            .ok_or(LatencyError::CaptureUnavailable)?;
        let found = locate::find_pattern(&screen, magic);
        #[cfg(feature = "debug-capture")]
        if found.is_none() {
            let path = std::path::Path::new("logs").join("locate-failure.png");
            match crate::debug_capture::save_png(&screen, &path) {
                Ok(()) => logger::info_p("engine", &format!("saved failed locate capture to {}", path.display())),
                Err(e) => logger::warn_p("engine", &format!("could not save locate capture: {}", e)),
            }
        }
        self.platform.release(screen);
        found.ok_or(LatencyError::PatternNotFound)
    }

    /// Capture the 8x1 pattern region at (x, y) and decode it.
    fn read(&mut self, x: u32, y: u32, magic: &MagicPattern) -> Option<Measurement> {
        let buf = self.platform.capture(x, y, PATTERN_PIXELS as u32, 1)?;
        let m = pattern::decode_measurement(&buf, magic);
        self.platform.release(buf);
        if let Some(m) = &m {
            logger::debug_p(
                "engine",
                &format!(
                    "t={} js={} keys={} scroll={} css={} mode={:?}",
                    m.screenshot_time, m.javascript_frames, m.key_down_events, m.scroll_position, m.css_frames, m.test_mode
                ),
            );
        }
        m
    }

    fn send_scroll(&mut self, x: i32, y: i32) -> Result<()> {
        self.platform
            .send_scroll(x, y)
            .map_err(|e| LatencyError::Input(format!("Failed to send scroll event to test window: {}", e)))
    }

    /// Run the test against a native window painting a fresh pattern, then
    /// close that window whatever the outcome.
    fn run_native_reference(&mut self, magic: &MagicPattern, depth: u32) -> Result<LatencyReport> {
        if depth > 0 {
            return Err(LatencyError::protocol(
                "Native reference window requested another native reference test. This is a bug in the test.",
            ));
        }
        let reference = MagicPattern::random_distinct(magic);
        let window_pattern = TestPattern::new(reference, TestMode::JavascriptLatency);
        logger::info_p(
            "engine",
            &format!("opening native reference window with pattern {}", pattern::encode_hex(&reference)),
        );
        self.platform
            .open_native_reference_window(&window_pattern)
            .map_err(|e| LatencyError::NativeReference(e.to_string()))?;

        let result = self.run(&reference, depth + 1);

        if let Err(e) = self.platform.close_native_reference_window() {
            logger::warn_p("engine", &format!("failed to close native reference window: {}", e));
        }
        result
    }

    /// The polling loop: one capture per iteration, dispatched on the mode
    /// the page reports.
    fn poll(&mut self, x: u32, y: u32, magic: &MagicPattern, first: Measurement) -> Result<LatencyReport> {
        let config = self.config;
        let start_time = first.screenshot_time;
        let mut channels = Channels::seed(&first, config);
        let mut previous = first;
        let mut sent_events: u32 = 0;
        let scroll_x = x as i32 + config.scroll_offset;
        let scroll_y = y as i32 + config.scroll_offset;
        let mut last_scroll_sent = start_time;

        if first.test_mode == TestMode::ScrollLatency {
            self.send_scroll(scroll_x, scroll_y)?;
            channels.scroll.previous_change_time = self.platform.now_ns();
        }

        loop {
            let mut m = self.read(x, y, magic).ok_or(LatencyError::WindowMoved)?;
            if m.test_mode == TestMode::Abort {
                return Err(LatencyError::Aborted);
            }
            let scroll_updated = channels.update(&m, previous.screenshot_time);

            match m.test_mode {
                TestMode::JavascriptLatency => {
                    let keys = &channels.key_down_events;
                    if keys.measurements >= config.latency_measurements {
                        break;
                    }
                    if keys.value_delta > sent_events {
                        return Err(LatencyError::protocol(
                            "More events received than sent! This is probably a bug in the test.",
                        ));
                    }
                    if m.screenshot_time - keys.previous_change_time > ms_to_ns(config.event_response_timeout_ms) {
                        return Err(LatencyError::unresponsive(
                            "Browser did not respond to keyboard input. Make sure the test page remains focused for the entire test.",
                        ));
                    }
                    if keys.value_delta == sent_events {
                        sleep::sleep_jitter_ms(config.input_jitter_ms);
                        self.platform.send_keystroke().map_err(|e| {
                            LatencyError::Input(format!("Failed to send keystroke to test window: {}", e))
                        })?;
                        channels.key_down_events.previous_change_time = self.platform.now_ns();
                        sent_events += 1;
                    }
                }
                TestMode::ScrollLatency => {
                    if channels.scroll.measurements >= config.latency_measurements {
                        break;
                    }
                    if m.screenshot_time - channels.scroll.previous_change_time > ms_to_ns(config.event_response_timeout_ms) {
                        return Err(LatencyError::unresponsive(
                            "Browser did not respond to scroll events. Make sure the test page remains focused for the entire test.",
                        ));
                    }
                    if scroll_updated {
                        m = self.wait_for_scroll_to_settle(x, y, magic, &mut channels.scroll, m)?;
                        sleep::sleep_jitter_ms(config.input_jitter_ms);
                        self.send_scroll(scroll_x, scroll_y)?;
                        channels.scroll.previous_change_time = self.platform.now_ns();
                    }
                }
                TestMode::PauseTime => {
                    // Keep the page scrolling so pauses show up in every channel.
                    if m.screenshot_time - last_scroll_sent > ms_to_ns(config.pause_scroll_interval_ms) {
                        self.send_scroll(scroll_x, scroll_y)?;
                        last_scroll_sent = self.platform.now_ns();
                    }
                }
                TestMode::PauseTimeFinished => break,
                other => {
                    return Err(LatencyError::protocol(format!(
                        "Invalid test type {:?}. This is a bug in the test.",
                        other
                    )));
                }
            }

            if m.screenshot_time - start_time > ms_to_ns(config.test_timeout_ms) {
                return Err(LatencyError::Timeout);
            }
            previous = m;
            sleep::sleep_ms(config.poll_interval_ms);
        }
        Ok(channels.report())
    }

    /// Re-capture until the scroll position has not moved for the settle
    /// period. Returns the last measurement taken.
    fn wait_for_scroll_to_settle(
        &mut self,
        x: u32,
        y: u32,
        magic: &MagicPattern,
        scroll: &mut ChannelStatistic,
        mut m: Measurement,
    ) -> Result<Measurement> {
        let wait_start = m.screenshot_time;
        let mut last_update = m.screenshot_time;
        while m.screenshot_time - last_update < ms_to_ns(self.config.scroll_settle_ms) {
            m = self.read(x, y, magic).ok_or(LatencyError::WindowMoved)?;
            if m.test_mode == TestMode::Abort {
                return Err(LatencyError::Aborted);
            }
            if m.screenshot_time - wait_start > ms_to_ns(self.config.scroll_settle_timeout_ms) {
                return Err(LatencyError::unresponsive(
                    "Browser kept scrolling for more than 1 second after a single scrollwheel event.",
                ));
            }
            if m.scroll_position != scroll.value {
                scroll.value = m.scroll_position;
                last_update = m.screenshot_time;
            }
        }
        Ok(m)
    }
}
