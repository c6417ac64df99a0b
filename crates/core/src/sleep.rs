use rand::Rng;
use std::thread;
use std::time::Duration;

/// Sleep a uniformly random 0..=`max_ms` whole milliseconds, so injected input
/// does not land at a fixed phase of the page's frame cycle.
pub fn sleep_jitter_ms(max_ms: u64) {
    if max_ms == 0 {
        return;
    }
    let ms = rand::thread_rng().gen_range(0..=max_ms);
    sleep_ms(ms);
}

/// Sleep for exact milliseconds (no jitter). Zero just yields.
pub fn sleep_ms(ms: u64) {
    if ms == 0 {
        thread::yield_now();
    } else {
        thread::sleep(Duration::from_millis(ms));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn zero_jitter_returns_immediately() {
        let start = Instant::now();
        sleep_jitter_ms(0);
        sleep_ms(0);
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn jitter_stays_within_bound() {
        let start = Instant::now();
        sleep_jitter_ms(3);
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
