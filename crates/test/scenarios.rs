//! End-to-end runs of the latency engine against the simulated screen.
//!
//! Every scenario uses the virtual clock, so the expected latencies follow
//! exactly from the page configuration: with 1 ms between captures, a page
//! answering after L ms yields a lower bound of L-1 and an upper bound of L.

use libtest_mimic::{Arguments, Failed, Trial};

use latency_core::error::ErrorClass;
use latency_core::orchestrator;
use latency_core::platform::Platform;
use latency_core::settings::{EngineConfig, SimConfig};
use latency_core::types::{TestKind, TestMode};
use latency_core::{measure_latency, LatencyError};
use latency_test::{engine_config, page_magic, sim_config, sim_with_page, Recorder, PAGE_PATTERN};

fn main() {
    let args = Arguments::from_args();
    let tests = vec![
        Trial::test("keydown_latency_follows_page_response", keydown_latency_follows_page_response),
        Trial::test("scroll_latency_reports_both_estimates", scroll_latency_reports_both_estimates),
        Trial::test("pause_time_catches_javascript_jank", pause_time_catches_javascript_jank),
        Trial::test("native_reference_runs_on_fresh_pattern", native_reference_runs_on_fresh_pattern),
        Trial::test("native_reference_closed_after_failure", native_reference_closed_after_failure),
        Trial::test("native_reference_open_failure", native_reference_open_failure),
        Trial::test("page_abort_stops_keydown_run", page_abort_stops_keydown_run),
        Trial::test("page_abort_during_scroll_settle", page_abort_during_scroll_settle),
        Trial::test("dropped_keystrokes_are_unresponsive", dropped_keystrokes_are_unresponsive),
        Trial::test("ignored_scroll_is_unresponsive", ignored_scroll_is_unresponsive),
        Trial::test("endless_scroll_fails_to_settle", endless_scroll_fails_to_settle),
        Trial::test("pause_test_times_out", pause_test_times_out),
        Trial::test("padded_rows_and_cleared_alpha", padded_rows_and_cleared_alpha),
        Trial::test("every_capture_is_released", every_capture_is_released),
        Trial::test("orchestrator_records_pattern", orchestrator_records_pattern),
    ];
    libtest_mimic::run(&args, tests).exit();
}

fn ensure(cond: bool, msg: impl Into<String>) -> Result<(), Failed> {
    if cond {
        Ok(())
    } else {
        let msg: String = msg.into();
        Err(msg.into())
    }
}

fn close_to(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 0.01
}

fn expect_class<T>(result: Result<T, LatencyError>, class: ErrorClass) -> Result<(), Failed> {
    match result {
        Ok(_) => Err(format!("expected {:?} failure, run succeeded", class).into()),
        Err(e) => ensure(e.class() == class, format!("expected {:?}, got {:?}: {}", class, e.class(), e)),
    }
}

fn keydown_latency_follows_page_response() -> Result<(), Failed> {
    let mut sim = sim_with_page(sim_config(), TestMode::JavascriptLatency);
    let report = measure_latency(&mut sim, &engine_config(), &page_magic())?;
    ensure(
        close_to(report.key_down_latency_ms, 4.5),
        format!("keydown latency {}", report.key_down_latency_ms),
    )?;
    ensure(report.scroll_latency_ms == 0.0, "no scroll measured in keydown mode")
}

fn scroll_latency_reports_both_estimates() -> Result<(), Failed> {
    let config = SimConfig { key_latency_us: 30_000, scroll_animation_us: 0, ..sim_config() };
    let mut sim = sim_with_page(config, TestMode::ScrollLatency);
    let report = measure_latency(&mut sim, &engine_config(), &page_magic())?;
    // upper 30, lower 29
    ensure(close_to(report.scroll_latency_ms, 44.5), format!("scroll latency {}", report.scroll_latency_ms))?;
    ensure(
        close_to(report.scroll_latency_midpoint_ms, 29.5),
        format!("scroll midpoint {}", report.scroll_latency_midpoint_ms),
    )
}

fn pause_time_catches_javascript_jank() -> Result<(), Failed> {
    let config = SimConfig { jank_at_ms: Some(800), jank_duration_ms: 120, ..sim_config() };
    let mut sim = sim_with_page(config, TestMode::PauseTime);
    let report = measure_latency(&mut sim, &engine_config(), &page_magic())?;
    ensure(
        report.max_js_pause_ms > 120.0 && report.max_js_pause_ms < 145.0,
        format!("max js pause {}", report.max_js_pause_ms),
    )?;
    ensure(report.max_css_pause_ms < 20.0, format!("max css pause {}", report.max_css_pause_ms))
}

fn native_reference_runs_on_fresh_pattern() -> Result<(), Failed> {
    let mut platform = Recorder::new(sim_with_page(sim_config(), TestMode::NativeReference));
    let report = measure_latency(&mut platform, &engine_config(), &page_magic())?;

    ensure(platform.opened.len() == 1, format!("opened {} windows", platform.opened.len()))?;
    let window = platform.opened[0];
    ensure(window.magic != page_magic(), "reference pattern reused the page pattern")?;
    ensure(window.test_mode == TestMode::JavascriptLatency, "reference window not in keydown mode")?;
    ensure(platform.closed == 1, "reference window not closed")?;
    ensure(!platform.inner.reference_window_open(), "reference window still on screen")?;
    // Reference window answers after 8 ms.
    ensure(
        close_to(report.key_down_latency_ms, 7.5),
        format!("reference keydown latency {}", report.key_down_latency_ms),
    )
}

fn native_reference_closed_after_failure() -> Result<(), Failed> {
    // Reference window placed off screen: its pattern can never be found.
    let config = SimConfig { reference_origin: (700, 500), ..sim_config() };
    let mut platform = Recorder::new(sim_with_page(config, TestMode::NativeReference));
    let result = measure_latency(&mut platform, &engine_config(), &page_magic());
    expect_class(result, ErrorClass::NotFound)?;
    ensure(platform.opened.len() == 1, "reference window not opened")?;
    ensure(platform.closed == 1, "reference window not closed after failure")?;
    ensure(!platform.inner.reference_window_open(), "reference window still on screen")
}

fn native_reference_open_failure() -> Result<(), Failed> {
    let mut platform = Recorder::new(sim_with_page(sim_config(), TestMode::NativeReference));
    platform.fail_open = true;
    let result = measure_latency(&mut platform, &engine_config(), &page_magic());
    expect_class(result, ErrorClass::Platform)?;
    ensure(platform.closed == 0, "closed a window that never opened")
}

fn page_abort_stops_keydown_run() -> Result<(), Failed> {
    let config = SimConfig { abort_after_ms: Some(300), ..sim_config() };
    let mut sim = sim_with_page(config, TestMode::JavascriptLatency);
    expect_class(measure_latency(&mut sim, &engine_config(), &page_magic()), ErrorClass::Aborted)
}

fn page_abort_during_scroll_settle() -> Result<(), Failed> {
    // First scroll shows at 32 ms, settling lasts until 132 ms.
    let config = SimConfig {
        key_latency_us: 30_000,
        scroll_animation_us: 0,
        abort_after_ms: Some(80),
        ..sim_config()
    };
    let mut sim = sim_with_page(config, TestMode::ScrollLatency);
    expect_class(measure_latency(&mut sim, &engine_config(), &page_magic()), ErrorClass::Aborted)
}

fn dropped_keystrokes_are_unresponsive() -> Result<(), Failed> {
    let config = SimConfig { drop_keystrokes: true, ..sim_config() };
    let mut sim = sim_with_page(config, TestMode::JavascriptLatency);
    let result = measure_latency(&mut sim, &engine_config(), &page_magic());
    if let Err(e) = &result {
        ensure(e.to_string().contains("keyboard input"), format!("unexpected message: {}", e))?;
    }
    expect_class(result, ErrorClass::Unresponsive)
}

fn ignored_scroll_is_unresponsive() -> Result<(), Failed> {
    // The first scroll only lands after six seconds.
    let config = SimConfig { key_latency_us: 6_000_000, ..sim_config() };
    let mut sim = sim_with_page(config, TestMode::ScrollLatency);
    let result = measure_latency(&mut sim, &engine_config(), &page_magic());
    if let Err(e) = &result {
        ensure(e.to_string().contains("scroll events"), format!("unexpected message: {}", e))?;
    }
    expect_class(result, ErrorClass::Unresponsive)
}

fn endless_scroll_fails_to_settle() -> Result<(), Failed> {
    // One wheel event animates for three seconds, moving a step every 12 ms.
    let config = SimConfig { scroll_step: 250, scroll_animation_us: 3_000_000, ..sim_config() };
    let mut sim = sim_with_page(config, TestMode::ScrollLatency);
    let result = measure_latency(&mut sim, &engine_config(), &page_magic());
    if let Err(e) = &result {
        ensure(e.to_string().contains("kept scrolling"), format!("unexpected message: {}", e))?;
    }
    expect_class(result, ErrorClass::Unresponsive)
}

fn pause_test_times_out() -> Result<(), Failed> {
    let config = SimConfig { pause_test_duration_ms: 60_000, ..sim_config() };
    let engine = EngineConfig { test_timeout_ms: 1500, ..engine_config() };
    let mut sim = sim_with_page(config, TestMode::PauseTime);
    let result = measure_latency(&mut sim, &engine, &page_magic());
    if let Err(e) = &result {
        ensure(e.to_string() == "Timeout.", format!("unexpected message: {}", e))?;
    }
    expect_class(result, ErrorClass::Timeout)
}

fn padded_rows_and_cleared_alpha() -> Result<(), Failed> {
    let config = SimConfig { row_padding: 12, clear_alpha: true, ..sim_config() };
    let mut sim = sim_with_page(config, TestMode::JavascriptLatency);
    let report = measure_latency(&mut sim, &engine_config(), &page_magic())?;
    ensure(
        close_to(report.key_down_latency_ms, 4.5),
        format!("keydown latency {}", report.key_down_latency_ms),
    )
}

fn every_capture_is_released() -> Result<(), Failed> {
    let mut sim = sim_with_page(sim_config(), TestMode::JavascriptLatency);
    measure_latency(&mut sim, &engine_config(), &page_magic())?;
    let (captures, releases) = sim.buffer_counts();
    ensure(captures > 50 && captures == releases, format!("{} captures, {} releases", captures, releases))?;

    let config = SimConfig { abort_after_ms: Some(100), ..sim_config() };
    let mut sim = sim_with_page(config, TestMode::JavascriptLatency);
    measure_latency(&mut sim, &engine_config(), &page_magic()).ok();
    let (captures, releases) = sim.buffer_counts();
    ensure(captures == releases, format!("after abort: {} captures, {} releases", captures, releases))?;
    ensure(sim.now_ns() > 0, "virtual clock did not advance")
}

fn orchestrator_records_pattern() -> Result<(), Failed> {
    let mut sim = latency_core::platform::sim::SimulatedPlatform::new(sim_config());
    let engine = EngineConfig { latency_measurements: 10, ..engine_config() };
    let record = orchestrator::run_with_pattern(&mut sim, &engine, TestKind::KeyLatency, page_magic());
    ensure(record.pattern_hex == PAGE_PATTERN, format!("pattern {}", record.pattern_hex))?;
    ensure(record.kind == TestKind::KeyLatency, "wrong kind recorded")?;
    let report = record.outcome.map_err(Failed::from)?;
    ensure(close_to(report.key_down_latency_ms, 4.5), format!("keydown latency {}", report.key_down_latency_ms))
}
