//! Progress indicators for the download and save phases.

use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Sink for "one more item done" events against a known total.
pub trait Progress: Send + Sync {
    fn start(&self, _total: usize) {}

    fn advance(&self);

    fn finish(&self) {}
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn advance(&self) {}
}

/// A one-line progress bar redrawn on stderr:
/// `[1/2] Downloading lyrics... [======>        ] 6/15`
#[derive(Debug)]
pub struct TerminalProgress {
    label: String,
    width: usize,
    total: AtomicUsize,
    done: AtomicUsize,
    draw: Mutex<()>,
}

impl TerminalProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            width: 15,
            total: AtomicUsize::new(0),
            done: AtomicUsize::new(0),
            draw: Mutex::new(()),
        }
    }

    pub fn render(&self, done: usize, total: usize) -> String {
        let filled = if total == 0 {
            self.width
        } else {
            (done.min(total) * self.width) / total
        };
        let mut bar = String::with_capacity(self.width);
        for i in 0..self.width {
            bar.push(match i.cmp(&filled) {
                std::cmp::Ordering::Less => '=',
                std::cmp::Ordering::Equal if done < total => '>',
                _ => ' ',
            });
        }
        format!("{} [{bar}] {done}/{total}", self.label)
    }

    fn redraw(&self) {
        let done = self.done.load(Ordering::SeqCst);
        let total = self.total.load(Ordering::SeqCst);
        let line = self.render(done, total);
        // A poisoned lock only means another thread panicked mid-draw.
        let _guard = self.draw.lock().unwrap_or_else(|e| e.into_inner());
        let mut stderr = io::stderr().lock();
        let _ = write!(stderr, "\r{line}");
        let _ = stderr.flush();
    }
}

impl Progress for TerminalProgress {
    fn start(&self, total: usize) {
        self.total.store(total, Ordering::SeqCst);
        self.done.store(0, Ordering::SeqCst);
        self.redraw();
    }

    fn advance(&self) {
        self.done.fetch_add(1, Ordering::SeqCst);
        self.redraw();
    }

    fn finish(&self) {
        let _ = writeln!(io::stderr());
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Counts events so tests can assert how often each phase advanced.
    #[derive(Debug, Default)]
    pub struct CountingProgress {
        pub total: AtomicUsize,
        pub advanced: AtomicUsize,
    }

    impl CountingProgress {
        pub fn advanced(&self) -> usize {
            self.advanced.load(Ordering::SeqCst)
        }
    }

    impl Progress for CountingProgress {
        fn start(&self, total: usize) {
            self.total.store(total, Ordering::SeqCst);
        }

        fn advance(&self) {
            self.advanced.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_partial_bar() {
        let progress = TerminalProgress::new("[1/2] Downloading lyrics...");
        assert_eq!(
            progress.render(5, 15),
            "[1/2] Downloading lyrics... [=====>         ] 5/15"
        );
    }

    #[test]
    fn test_render_empty_and_full() {
        let progress = TerminalProgress::new("x");
        assert_eq!(progress.render(0, 3), "x [>              ] 0/3");
        assert_eq!(progress.render(3, 3), "x [===============] 3/3");
        assert_eq!(progress.render(0, 0), "x [===============] 0/0");
    }
}
