/// Progress reporting for a running transfer.
///
/// The copier notifies an optional [`ProgressObserver`] after every chunk.
/// Observers are passed explicitly to each transfer; there is no global
/// registration. Nothing an observer does can fail the transfer.

use std::io::Write;
use std::time::{Duration, Instant};

/// Render at most once per this many bytes of progress (500 KB).
pub const UPDATE_INTERVAL: u64 = 500 * 1024;

/// Minimum time between two renders (5 per second).
pub const MIN_RENDER_INTERVAL: Duration = Duration::from_millis(200);

/// Width of the bar in terminal columns.
pub const PROGRESS_BAR_WIDTH: usize = 40;

const SIZE_KB: u64 = 1024;
const SIZE_MB: u64 = 1024 * 1024;
const SIZE_GB: u64 = 1024 * 1024 * 1024;

/// Receives `(bytes_so_far, total)` after each chunk.
pub trait ProgressObserver {
    fn on_progress(&mut self, done: u64, total: u64);
}

impl<F: FnMut(u64, u64)> ProgressObserver for F {
    fn on_progress(&mut self, done: u64, total: u64) {
        self(done, total)
    }
}

/// Decides whether a progress notification should be rendered.
#[derive(Debug, Clone)]
pub struct Throttle {
    byte_interval: u64,
    min_interval: Duration,
    last_bytes: u64,
    last_render: Option<Instant>,
}

impl Throttle {
    pub fn new(byte_interval: u64, min_interval: Duration) -> Self {
        Self {
            byte_interval,
            min_interval,
            last_bytes: 0,
            last_render: None,
        }
    }

    /// Returns true when this update should be drawn. The final update
    /// (`done >= total`) always is.
    pub fn should_render(&mut self, done: u64, total: u64, now: Instant) -> bool {
        let complete = done >= total;
        if !complete {
            if done.saturating_sub(self.last_bytes) < self.byte_interval {
                return false;
            }
            if let Some(last) = self.last_render {
                if now.saturating_duration_since(last) < self.min_interval {
                    return false;
                }
            }
        }
        self.last_bytes = done;
        self.last_render = Some(now);
        true
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(UPDATE_INTERVAL, MIN_RENDER_INTERVAL)
    }
}

/// Terminal progress bar with speed and ETA.
///
/// ```text
/// [################                        ] 42% (1.00 MB / 2.38 MB) 3.10 MB/s  - ETA: 1.2 s
/// ```
pub struct TerminalProgress<W: Write> {
    out: W,
    throttle: Throttle,
    start: Instant,
}

impl TerminalProgress<std::io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(std::io::stderr(), Throttle::default())
    }
}

impl<W: Write> TerminalProgress<W> {
    pub fn new(out: W, throttle: Throttle) -> Self {
        Self {
            out,
            throttle,
            start: Instant::now(),
        }
    }

    /// Draw the bar at 100% and print the summary line.
    pub fn finish(&mut self, total: u64) {
        let elapsed = self.start.elapsed();
        self.render(total, total, true, elapsed);
        let _ = writeln!(
            self.out,
            "\nCompleted in {:.2} seconds ({} avg)",
            elapsed.as_secs_f64(),
            format_speed(total, elapsed)
        );
        let _ = self.out.flush();
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&mut self, done: u64, total: u64, force_complete: bool, elapsed: Duration) {
        let percentage = if force_complete || total == 0 {
            100
        } else {
            (done.min(total) * 100 / total) as usize
        };
        let bars = percentage * PROGRESS_BAR_WIDTH / 100;

        let eta = if percentage > 0 && percentage < 100 {
            let secs = elapsed.as_secs_f64() / percentage as f64 * (100 - percentage) as f64;
            format!(" - ETA: {:.1} s", secs)
        } else {
            String::new()
        };

        let _ = write!(
            self.out,
            "\r\x1b[K[{}{}] {}% ({} / {}) {} {}",
            "#".repeat(bars),
            " ".repeat(PROGRESS_BAR_WIDTH - bars),
            percentage,
            human_readable_size(done),
            human_readable_size(total),
            format_speed(done, elapsed),
            eta,
        );
        let _ = self.out.flush();
    }
}

impl<W: Write> ProgressObserver for TerminalProgress<W> {
    fn on_progress(&mut self, done: u64, total: u64) {
        let now = Instant::now();
        if self.throttle.should_render(done, total, now) {
            let elapsed = now.saturating_duration_since(self.start);
            self.render(done, total, done >= total, elapsed);
        }
    }
}

/// Format a byte count as bytes, KB, MB or GB with two decimals.
pub fn human_readable_size(bytes: u64) -> String {
    if bytes >= SIZE_GB {
        format!("{:.2} GB", bytes as f64 / SIZE_GB as f64)
    } else if bytes >= SIZE_MB {
        format!("{:.2} MB", bytes as f64 / SIZE_MB as f64)
    } else if bytes >= SIZE_KB {
        format!("{:.2} KB", bytes as f64 / SIZE_KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

fn format_speed(bytes: u64, elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 { bytes as f64 / secs } else { 0.0 };
    format!("{}/s", human_readable_size(rate as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(human_readable_size(512), "512 bytes");
        assert_eq!(human_readable_size(1536), "1.50 KB");
        assert_eq!(human_readable_size(5 * SIZE_MB), "5.00 MB");
        assert_eq!(human_readable_size(3 * SIZE_GB / 2), "1.50 GB");
    }

    #[test]
    fn throttle_by_bytes() {
        let mut t = Throttle::new(100, Duration::ZERO);
        let now = Instant::now();
        assert!(!t.should_render(50, 1000, now));
        assert!(t.should_render(100, 1000, now));
        assert!(!t.should_render(150, 1000, now));
        assert!(t.should_render(200, 1000, now));
    }

    #[test]
    fn throttle_by_time() {
        let mut t = Throttle::new(1, Duration::from_millis(200));
        let start = Instant::now();
        assert!(t.should_render(10, 1000, start));
        assert!(!t.should_render(20, 1000, start + Duration::from_millis(100)));
        assert!(t.should_render(30, 1000, start + Duration::from_millis(250)));
    }

    #[test]
    fn final_update_always_renders() {
        let mut t = Throttle::new(u64::MAX, Duration::from_secs(3600));
        let now = Instant::now();
        assert!(!t.should_render(999, 1000, now));
        assert!(t.should_render(1000, 1000, now));
        assert!(t.should_render(0, 0, now));
    }

    #[test]
    fn closures_are_observers() {
        let mut seen = Vec::new();
        {
            let mut obs = |done: u64, total: u64| seen.push((done, total));
            let obs: &mut dyn ProgressObserver = &mut obs;
            obs.on_progress(1, 2);
            obs.on_progress(2, 2);
        }
        assert_eq!(seen, vec![(1, 2), (2, 2)]);
    }

    #[test]
    fn terminal_bar_renders_completion() {
        let mut bar = TerminalProgress::new(Vec::new(), Throttle::new(0, Duration::ZERO));
        bar.on_progress(SIZE_MB, 2 * SIZE_MB);
        bar.finish(2 * SIZE_MB);
        let text = String::from_utf8(bar.into_inner()).unwrap();
        assert!(text.contains("50% (1.00 MB / 2.00 MB)"));
        assert!(text.contains(&format!("[{}] 100%", "#".repeat(PROGRESS_BAR_WIDTH))));
        assert!(text.contains("Completed in"));
    }
}
