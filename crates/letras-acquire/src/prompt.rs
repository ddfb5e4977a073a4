use std::io::{self, BufRead, Write};

/// Yes/no question asked of the operator.
pub trait Confirm: Send + Sync {
    fn confirm(&self, question: &str) -> bool;
}

/// Asks on stdout and reads one line from stdin. Anything other than
/// `y` or `yes` (case-insensitive), including a read error, is a no.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, question: &str) -> bool {
        print!("\n{question} (y/N): ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(_) => is_yes(&line),
            Err(err) => {
                tracing::warn!(error = %err, "Could not read answer, assuming no");
                false
            }
        }
    }
}

/// A preset answer, for non-interactive runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&self, question: &str) -> bool {
        tracing::debug!(question, answer = self.0, "Answering prompt without asking");
        self.0
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
