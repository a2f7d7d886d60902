//! Per-connection record of the raw server replies.
//!
//! Each command primitive appends the reply it read, keyed by a protocol
//! step, so a caller can log exactly what the server said when an operation
//! fails. The record belongs to one connection and is reset at the start of
//! every top-level operation; nothing here is global.

use std::fmt::{self, Display, Formatter};

/// The protocol step a transcript entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The initial 220 greeting.
    Banner,
    /// EHLO exchange.
    Ehlo,
    /// HELO exchange (fallback).
    Helo,
    /// AUTH initiation for one mechanism.
    Auth,
    /// A reply to an AUTH challenge.
    AuthChallenge,
    /// MAIL FROM.
    MailFrom,
    /// RCPT TO.
    RcptTo,
    /// The DATA command itself.
    Data,
    /// The reply to the end-of-data marker.
    DataEnd,
    /// RSET.
    Rset,
    /// QUIT.
    Quit,
}

impl Display for Step {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::Banner => "banner",
            Step::Ehlo => "ehlo",
            Step::Helo => "helo",
            Step::Auth => "auth",
            Step::AuthChallenge => "auth-challenge",
            Step::MailFrom => "mail-from",
            Step::RcptTo => "rcpt-to",
            Step::Data => "data",
            Step::DataEnd => "data-end",
            Step::Rset => "rset",
            Step::Quit => "quit",
        })
    }
}

/// One recorded exchange: the step and the raw reply lines read for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Which protocol step produced the reply.
    pub step: Step,
    /// The reply, one string per protocol line.
    pub lines: Vec<String>,
}

/// Ordered collection of [`Entry`] values for the most recent operation.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn record(&mut self, step: Step, lines: Vec<String>) {
        self.entries.push(Entry { step, lines });
    }

    /// All recorded entries, oldest first.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// The reply lines recorded for the most recent occurrence of `step`.
    pub fn lines_for(&self, step: Step) -> Option<&[String]> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.step == step)
            .map(|entry| entry.lines.as_slice())
    }

    /// Whether anything has been recorded since the last reset.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn records_in_order_and_resets() {
        let mut transcript = Transcript::default();
        transcript.record(Step::Banner, vec!["220 ready".into()]);
        transcript.record(Step::Ehlo, vec!["250-me".into(), "250 OK".into()]);
        transcript.record(Step::Ehlo, vec!["250 again".into()]);

        assert_eq!(transcript.entries().len(), 3);
        assert_eq!(transcript.lines_for(Step::Ehlo).unwrap(), ["250 again"]);
        assert_eq!(transcript.lines_for(Step::Banner).unwrap(), ["220 ready"]);
        assert!(transcript.lines_for(Step::Quit).is_none());

        transcript.clear();
        assert!(transcript.is_empty());
    }

    #[test]
    fn step_names() {
        assert_eq!(Step::MailFrom.to_string(), "mail-from");
        assert_eq!(Step::AuthChallenge.to_string(), "auth-challenge");
    }
}
