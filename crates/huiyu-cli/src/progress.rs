//! Progress reporting for long-running commands

use std::io::{self, Write};

/// Simple progress reporter for CLI commands
pub struct ProgressReporter {
    total: usize,
    processed: usize,
}

impl ProgressReporter {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            processed: 0,
        }
    }

    pub fn update(&mut self, processed: usize, total: usize) {
        self.processed = processed;
        self.total = total;
    }

    pub fn set_message(&self, msg: &str) {
        eprint!("\r[{}/{}] {:<50}", self.processed + 1, self.total, msg);
        io::stderr().flush().ok();
    }

    pub fn finish(&self) {
        eprintln!("\rDone ({}/{}){:<50}", self.processed, self.total, "");
    }
}
