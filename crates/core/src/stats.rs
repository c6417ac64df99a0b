use crate::logger;
use crate::types::{ms_to_ns, NANOS_PER_MS};

/// Change tracker for one wrapping byte counter painted by the test page.
///
/// Every observed transition is bounded by two sample times: the last sample
/// that still showed the old value (lower bound) and the first sample showing
/// the new one (upper bound). Both are measured from the previous change, or
/// from the moment input was injected when the engine resets
/// `previous_change_time` after sending an event.
#[derive(Debug, Clone)]
pub struct ChannelStatistic {
    pub name: &'static str,
    pub value: u8,
    pub value_delta: u32,
    pub previous_change_time: i64,
    pub measurements: u32,
    pub lower_bound_time: i64,
    pub upper_bound_time: i64,
    pub max_lower_bound: i64,
    slow_screenshot_ns: i64,
    min_lower_bound_ns: i64,
}

impl ChannelStatistic {
    pub fn new(name: &'static str, value: u8, start_time: i64) -> Self {
        Self {
            name,
            value,
            value_delta: 0,
            previous_change_time: start_time,
            measurements: 0,
            lower_bound_time: 0,
            upper_bound_time: 0,
            max_lower_bound: 0,
            slow_screenshot_ns: 20 * NANOS_PER_MS,
            min_lower_bound_ns: 5 * NANOS_PER_MS,
        }
    }

    /// Override the slow-screenshot filter thresholds (milliseconds).
    pub fn with_slow_screenshot_filter(mut self, slow_screenshot_ms: u64, min_lower_bound_ms: u64) -> Self {
        self.slow_screenshot_ns = ms_to_ns(slow_screenshot_ms);
        self.min_lower_bound_ns = ms_to_ns(min_lower_bound_ms);
        self
    }

    /// Feed one sample. Returns true if the value changed.
    pub fn update(&mut self, value: u8, screenshot_time: i64, previous_screenshot_time: i64) -> bool {
        let mut change = value as i32 - self.value as i32;
        if change < 0 {
            change += 256;
        }
        if change == 0 {
            return false;
        }

        let lower_bound = previous_screenshot_time - self.previous_change_time;
        let screenshot_duration = screenshot_time - previous_screenshot_time;
        if lower_bound <= 0 {
            logger::debug_p("stats", &format!("{}: no screenshot before response", self.name));
        } else if screenshot_duration > self.slow_screenshot_ns && lower_bound < self.min_lower_bound_ns {
            logger::debug_p("stats", &format!("{}: ignoring measurement due to slow screenshot", self.name));
        } else {
            self.measurements += 1;
            self.upper_bound_time += screenshot_time - self.previous_change_time;
            self.lower_bound_time += lower_bound;
            if lower_bound > self.max_lower_bound {
                logger::debug_p(
                    "stats",
                    &format!("{}: max lower bound now {:.3} ms", self.name, lower_bound as f64 / NANOS_PER_MS as f64),
                );
                self.max_lower_bound = lower_bound;
            }
        }

        self.previous_change_time = screenshot_time;
        self.value = value;
        self.value_delta += change as u32;
        true
    }

    pub fn upper_bound_ms(&self) -> f64 {
        self.mean_ms(self.upper_bound_time)
    }

    pub fn lower_bound_ms(&self) -> f64 {
        self.mean_ms(self.lower_bound_time)
    }

    /// (upper + lower) / 2, the unbiased latency estimate.
    pub fn midpoint_ms(&self) -> f64 {
        (self.upper_bound_ms() + self.lower_bound_ms()) / 2.0
    }

    pub fn max_lower_bound_ms(&self) -> f64 {
        self.max_lower_bound as f64 / NANOS_PER_MS as f64
    }

    fn mean_ms(&self, total: i64) -> f64 {
        if self.measurements == 0 {
            return 0.0;
        }
        total as f64 / self.measurements as f64 / NANOS_PER_MS as f64
    }
}
