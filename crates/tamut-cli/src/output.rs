//! Output formatting and progress reporting

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tamut::MutationScore;

/// Output format for results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON on stdout
    Json,
}

/// Progress and status lines on stderr.
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    pub use_color: bool,
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Start a progress bar over `total` test cases
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet {
            return;
        }

        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Handle for advancing the bar from worker threads
    #[must_use]
    pub fn progress_bar(&self) -> Option<ProgressBar> {
        self.progress_bar.clone()
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref pb) = self.progress_bar {
            pb.finish_and_clear();
        }
    }

    fn line(&self, prefix: String, message: &str) {
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// A killed mutant
    pub fn killed(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("✓").green().bold().to_string()
        } else {
            "KILLED".to_string()
        };
        self.line(prefix, message);
    }

    /// A surviving mutant; printed even in quiet mode
    pub fn survived(&self, message: &str) {
        let prefix = if self.use_color {
            style("✗").red().bold().to_string()
        } else {
            "SURVIVED".to_string()
        };
        self.line(prefix, message);
    }

    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };
        self.line(prefix, message);
    }

    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };
        self.line(prefix, message);
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }

        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&styled);
    }

    /// Print the mutation score summary
    pub fn summary(&self, score: &MutationScore, errors: usize, duration: Duration) {
        if self.quiet && score.survived == 0 && errors == 0 {
            return;
        }

        let _ = self.term.write_line("");
        let percent = score.score * 100.0;
        let duration_secs = duration.as_secs_f64();

        if self.use_color {
            let killed_style = Style::new().green().bold();
            let survived_style = Style::new().red().bold();
            let muted = Style::new().yellow();

            let status = if score.survived > 0 {
                survived_style.apply_to(format!("{percent:.1}%"))
            } else {
                killed_style.apply_to(format!("{percent:.1}%"))
            };

            let _ = self.term.write_line(&format!(
                "Mutation score {} over {} mutants in {:.2}s ({} killed, {} survived, {} inconclusive, {} errors)",
                status,
                score.total_mutants,
                duration_secs,
                killed_style.apply_to(score.killed),
                if score.survived > 0 {
                    survived_style.apply_to(score.survived).to_string()
                } else {
                    score.survived.to_string()
                },
                muted.apply_to(score.inconclusive),
                muted.apply_to(errors)
            ));
        } else {
            let _ = self.term.write_line(&format!(
                "Mutation score {percent:.1}% over {} mutants in {duration_secs:.2}s ({} killed, {} survived, {} inconclusive, {errors} errors)",
                score.total_mutants, score.killed, score.survived, score.inconclusive
            ));
        }
    }
}
