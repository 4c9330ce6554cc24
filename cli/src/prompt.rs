//! Interactive review of drafted replies on the terminal.

use std::io::{self, BufRead, Write};

use email_triage::responder::{Decision, DecisionSource, Draft};
use email_triage::ActionableRecord;

const RULE: &str = "==================================================";

/// Reads decisions line by line. End of input skips the current email.
pub struct TerminalPrompt<R, W> {
    input: R,
    output: W,
}

impl TerminalPrompt<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> TerminalPrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `question` and read one trimmed line; `None` at end of input.
    fn ask(&mut self, question: &str) -> Option<String> {
        write!(self.output, "{}", question).ok()?;
        self.output.flush().ok()?;

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }

    fn show(&mut self, record: &ActionableRecord, recipient: Option<&str>, draft: &Draft) -> io::Result<()> {
        let message = &record.message;
        let analysis = &record.classification;

        writeln!(self.output, "\n{}", RULE)?;
        writeln!(self.output, "Subject: {}", message.subject)?;
        writeln!(self.output, "From: {}", message.from_display)?;
        writeln!(self.output, "Reply to: {}", recipient.unwrap_or("(no address found)"))?;
        writeln!(
            self.output,
            "Importance: {} | Time sensitive: {} | Topics: {}",
            analysis.importance.as_str(),
            if analysis.time_sensitive { "yes" } else { "no" },
            analysis.topics.join(", ")
        )?;
        writeln!(self.output, "{}", RULE)?;
        writeln!(self.output, "Subject: {}\n", draft.subject)?;
        writeln!(self.output, "{}", draft.body)?;
        writeln!(self.output, "{}", RULE)
    }
}

impl<R: BufRead, W: Write> DecisionSource for TerminalPrompt<R, W> {
    fn decide(&mut self, record: &ActionableRecord, recipient: Option<&str>, draft: &Draft) -> Decision {
        if self.show(record, recipient, draft).is_err() {
            return Decision::Skip;
        }

        loop {
            let Some(answer) = self.ask("\nSend this response? (y/n/edit/skip): ") else {
                return Decision::Skip;
            };

            match answer.to_lowercase().as_str() {
                "y" | "yes" => return Decision::Accept,
                "n" | "no" => return Decision::Reject,
                "skip" | "s" => return Decision::Skip,
                "edit" | "e" => {
                    let Some(instructions) = self.ask("How should the response be changed?\n> ") else {
                        return Decision::Skip;
                    };
                    if !instructions.is_empty() {
                        return Decision::Edit(instructions);
                    }
                }
                _ => {}
            }
            let _ = writeln!(self.output, "Please answer y, n, edit or skip.");
        }
    }

    fn confirm_already_responded(&mut self, record: &ActionableRecord) -> bool {
        let question = format!(
            "\n'{}' appears to have been answered already. Process anyway? (y/n): ",
            record.message.subject
        );
        matches!(self.ask(&question).as_deref(), Some("y" | "Y" | "yes"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use email_triage::{Classification, Importance, Message};

    fn record() -> ActionableRecord {
        ActionableRecord {
            message: Message::new("Invoice #4", "Ann <ann@co.com>", None, "Please pay"),
            classification: Classification {
                importance: Importance::High,
                reason: "billing".into(),
                needs_response: true,
                time_sensitive: true,
                topics: vec!["billing".into()],
            },
            already_responded: false,
        }
    }

    fn draft() -> Draft {
        Draft {
            subject: "Re: Invoice #4".into(),
            body: "Paid.\n\nBest regards".into(),
        }
    }

    fn decide(input: &str) -> (Decision, String) {
        let mut output = Vec::new();
        let decision = TerminalPrompt::new(input.as_bytes(), &mut output).decide(&record(), Some("ann@co.com"), &draft());
        (decision, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_answers() {
        assert_eq!(decide("y\n").0, Decision::Accept);
        assert_eq!(decide("N\n").0, Decision::Reject);
        assert_eq!(decide("skip\n").0, Decision::Skip);
        assert_eq!(decide("edit\nmore formal\n").0, Decision::Edit("more formal".into()));
    }

    #[test]
    fn test_reprompts_on_unknown_answer() {
        let (decision, output) = decide("maybe\nedit\n\ny\n");
        assert_eq!(decision, Decision::Accept);
        assert_eq!(output.matches("Send this response?").count(), 3);
        assert!(output.contains("Reply to: ann@co.com"));
        assert!(output.contains("Paid."));
    }

    #[test]
    fn test_end_of_input_skips() {
        assert_eq!(decide("").0, Decision::Skip);
        assert_eq!(decide("edit\n").0, Decision::Skip);
    }

    #[test]
    fn test_confirm_already_responded() {
        let mut output = Vec::new();
        assert!(TerminalPrompt::new("y\n".as_bytes(), &mut output).confirm_already_responded(&record()));
        assert!(!TerminalPrompt::new("n\n".as_bytes(), &mut output).confirm_already_responded(&record()));
        assert!(!TerminalPrompt::new("".as_bytes(), &mut output).confirm_already_responded(&record()));
    }
}
