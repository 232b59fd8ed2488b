//! User-facing log sinks.
//!
//! A sink receives the run's progress and result lines, one line per call,
//! and owns their presentation. It is separate from `tracing`, which carries
//! diagnostics for developers.

/// Append-only receiver of pipeline log lines.
pub trait LogSink {
    fn log(&mut self, line: &str);
}

impl<F: FnMut(&str)> LogSink for F {
    fn log(&mut self, line: &str) {
        self(line)
    }
}

/// Collects lines in memory.
impl LogSink for Vec<String> {
    fn log(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Writes each line to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn log(&mut self, line: &str) {
        println!("{line}");
    }
}

/// Forwards each line to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&mut self, line: &str) {
        tracing::info!(target: "oar_classify::run", "{}", line);
    }
}
