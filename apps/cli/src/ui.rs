//! User-facing status lines on stdout. Diagnostics go through `tracing`.

use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crossterm::style::Stylize;

const CLEAR_LINE: &str = "\x1B[2K\r";

pub fn heading(text: &str) {
    println!("{}\n", format!("=== {text} ===").bold());
}

pub fn success(text: &str) {
    println!("{} {text}", "✔".green());
}

pub fn failure(text: &str) {
    eprintln!("{} {text}", "✘".red());
}

pub fn hint(text: &str) {
    println!("{}", text.dark_grey());
}

/// Transient status shown until the next line replaces it.
pub fn pending(text: &str) {
    print!("{CLEAR_LINE}{}", text.dark_grey());
    let _ = io::stdout().flush();
}

pub fn clear_pending() {
    print!("{CLEAR_LINE}");
    let _ = io::stdout().flush();
}

/// `[done/total] <verb>...` counter shared by concurrent tasks.
///
/// Completed items may print a line of their own above the counter.
pub struct Progress {
    total: usize,
    done: AtomicUsize,
    verb: &'static str,
    lock: Mutex<()>,
}

impl Progress {
    pub fn new(total: usize, verb: &'static str) -> Self {
        let progress = Self {
            total,
            done: AtomicUsize::new(0),
            verb,
            lock: Mutex::new(()),
        };
        pending(&progress.counter(0));
        progress
    }

    fn counter(&self, done: usize) -> String {
        format!("[{done}/{}] {}...", self.total, self.verb)
    }

    /// Marks one item finished, printing `line` above the counter if given.
    pub fn tick(&self, line: Option<String>) -> usize {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let done = self.done.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(line) = line {
            print!("{CLEAR_LINE}");
            println!("{line}");
        }
        pending(&self.counter(done));
        done
    }

    pub fn finish(&self) {
        clear_pending();
    }
}

pub fn ok_mark() -> String {
    "✔".green().to_string()
}

pub fn fail_mark() -> String {
    "✘".red().to_string()
}

pub fn repo_mark() -> String {
    "●".green().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_counts_ticks() {
        let progress = Progress::new(3, "searching");
        assert_eq!(progress.tick(None), 1);
        assert_eq!(progress.tick(Some("line".to_string())), 2);
        assert_eq!(progress.counter(2), "[2/3] searching...");
        progress.finish();
    }
}
