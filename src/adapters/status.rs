use crate::domain::model::Outcome;
use crate::domain::ports::{StatusHandle, StatusSink, Tone};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::time::Duration;

/// Status output on stdout: spinners on a terminal, plain lines when piped.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleStatus {
    interactive: bool,
}

impl ConsoleStatus {
    pub fn detect() -> Self {
        Self {
            interactive: std::io::stdout().is_terminal(),
        }
    }

    pub fn plain() -> Self {
        Self { interactive: false }
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }
}

impl StatusSink for ConsoleStatus {
    fn heading(&self, text: &str, tone: Tone) {
        match tone {
            Tone::Start => println!("{}", text.bold().red()),
            Tone::Complete => println!("{}", text.bold().green()),
        }
    }

    fn begin(&self, title: &str) -> Box<dyn StatusHandle> {
        if self.interactive {
            Box::new(SpinnerStatus::start(title))
        } else {
            println!("{}", title);
            Box::new(PlainStatus)
        }
    }
}

struct SpinnerStatus {
    progress_bar: ProgressBar,
}

impl SpinnerStatus {
    fn start(title: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(title.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));

        Self { progress_bar: pb }
    }
}

impl StatusHandle for SpinnerStatus {
    fn complete(self: Box<Self>, outcome: Outcome, message: &str) {
        self.progress_bar.finish_and_clear();
        let symbol = match outcome {
            Outcome::Identical => "✔".green(),
            Outcome::Different => "✖".red(),
            Outcome::Inconclusive => "⚠".yellow(),
        };
        println!("{} {}", symbol, message);
    }
}

struct PlainStatus;

impl StatusHandle for PlainStatus {
    fn complete(self: Box<Self>, outcome: Outcome, message: &str) {
        println!("{}", plain_line(outcome, message));
    }
}

pub fn plain_line(outcome: Outcome, message: &str) -> String {
    let prefix = match outcome {
        Outcome::Identical => "success:",
        Outcome::Different => "failed:",
        Outcome::Inconclusive => "warning:",
    };
    format!("{}  {}", prefix, message)
}
