use std::sync::{Arc, Mutex, mpsc};
use std::time::Instant;

use crate::engine::measure_latency;
use crate::logger;
use crate::pattern::{self, MagicPattern};
use crate::platform::Workbench;
use crate::settings::EngineConfig;
use crate::types::*;

/// Show the test page for `kind` painting `magic`, run the engine against
/// it, and take the page down again.
pub fn run_with_pattern(
    platform: &mut dyn Workbench,
    config: &EngineConfig,
    kind: TestKind,
    magic: MagicPattern,
) -> RunRecord {
    let pattern_hex = pattern::encode_hex(&magic);
    logger::info(&format!("running {} test, pattern {}", kind.label(), pattern_hex));

    platform.show_test_page(kind.mode(), magic);
    let started = Instant::now();
    let outcome = measure_latency(&mut *platform, config, &magic).map_err(|e| {
        logger::error(&format!("{} test failed ({:?}): {}", kind.label(), e.class(), e));
        e.to_string()
    });
    platform.close_test_page();

    let elapsed_ms = started.elapsed().as_millis() as u64;
    if outcome.is_ok() {
        logger::info(&format!("{} test finished in {} ms", kind.label(), elapsed_ms));
    }
    RunRecord { kind, pattern_hex, outcome, elapsed_ms }
}

/// Same as [`run_with_pattern`] with a freshly picked page pattern.
pub fn run_test(platform: &mut dyn Workbench, config: &EngineConfig, kind: TestKind) -> RunRecord {
    run_with_pattern(platform, config, kind, MagicPattern::for_page())
}

/// Main orchestration loop. Runs on a background thread, one test at a time.
pub fn orchestrate(
    records: Arc<Mutex<Vec<RunRecord>>>,
    orch_state: Arc<Mutex<OrchestratorState>>,
    mut platform: Box<dyn Workbench>,
    config: EngineConfig,
    cmd_rx: mpsc::Receiver<Command>,
) {
    // A closed channel means the front-end is gone.
    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            Command::Quit => break,
            Command::Run(kind) => {
                *orch_state.lock().unwrap() = OrchestratorState::Running;
                let record = run_test(platform.as_mut(), &config, kind);
                records.lock().unwrap().push(record);
                *orch_state.lock().unwrap() = OrchestratorState::Idle;
            }
        }
    }
    logger::info("orchestrator stopped");
}
