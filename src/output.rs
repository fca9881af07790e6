// ABOUTME: Output formatting for update cycle results.
// ABOUTME: Supports normal, quiet (only when something happened), and JSON output modes.

use crate::update::CycleReport;
use serde::Serialize;
use std::time::Instant;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output for every cycle
    Normal,
    /// Only cycles that restarted or failed something
    Quiet,
    /// JSON lines for scripting
    Json,
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Start timing a cycle.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn duration_secs(&self) -> Option<f64> {
        self.start_time.map(|_| self.elapsed_secs())
    }

    /// Print the outcome of a completed cycle.
    pub fn report(&self, report: &CycleReport) {
        match self.mode {
            OutputMode::Normal => {
                println!("{}", render(report, self.elapsed_secs()));
            }
            OutputMode::Quiet => {
                if !report.started.is_empty() || report.has_failures() {
                    println!("{}", render(report, self.elapsed_secs()));
                }
            }
            OutputMode::Json => {
                let event = CycleEvent {
                    event: "cycle",
                    report,
                    duration_secs: self.duration_secs(),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    println!("{json}");
                }
            }
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => {
                let event = ErrorEvent {
                    event: "error",
                    message,
                    duration_secs: self.duration_secs(),
                };
                if let Ok(json) = serde_json::to_string(&event) {
                    eprintln!("{json}");
                }
            }
        }
    }
}

/// Human-readable rendering of a cycle report.
pub fn render(report: &CycleReport, elapsed_secs: f64) -> String {
    let mut out = format!(
        "[{}] {}",
        report.started_at.format("%Y-%m-%d %H:%M:%S"),
        report.summary()
    );
    if elapsed_secs > 0.0 {
        out.push_str(&format!(" ({:.1}s)", elapsed_secs));
    }
    if !report.started.is_empty() {
        out.push_str(&format!("\n  restarted: {}", report.started.join(", ")));
    }
    if !report.images_removed.is_empty() {
        out.push_str(&format!(
            "\n  removed images: {}",
            report.images_removed.join(", ")
        ));
    }
    for failure in report.failures() {
        out.push_str(&format!("\n  {}", failure.message));
    }
    out
}

#[derive(Serialize)]
struct CycleEvent<'a> {
    event: &'a str,
    report: &'a CycleReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

#[derive(Serialize)]
struct ErrorEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}
