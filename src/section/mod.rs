//! Section flow control — which resume section the conversation is on.
//!
//! The conversation walks a fixed, strictly forward section order:
//!
//! ```text
//! Introduction → Contact → Summary → Experience → Education → Skills
//!             → Projects → Done
//! ```
//!
//! [`SectionTracker`] owns the current position. For every user submission it
//! decides between two turn intents:
//!
//! * **Advance** — the input contains one of the approval keywords. The last
//!   model reply is captured as the content of the section being left (except
//!   when leaving Introduction, which produces no resume field), and the
//!   tracker moves one step forward. The next section's canned prompt becomes
//!   the reply for that turn — no model call is made.
//! * **Converse** — anything else; the input is sent to the model tagged with
//!   the current section.
//!
//! Advancing while already at [`Section::Done`] clamps: the tracker stays put
//! and the turn is treated as conversation.

pub mod prompts;

pub use prompts::clean_draft_reply;

// ---------------------------------------------------------------------------
// Section
// ---------------------------------------------------------------------------

/// A resume topic the conversation progresses through.
///
/// `Introduction` and `Done` are pseudo-sections: they frame the conversation
/// but never appear in the assembled resume. The derive order of the variants
/// is the section order, so `Ord` sorts sections the way the resume lists
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Introduction,
    Contact,
    Summary,
    Experience,
    Education,
    Skills,
    Projects,
    Done,
}

/// All sections in conversation order.
pub const SECTION_ORDER: [Section; 8] = [
    Section::Introduction,
    Section::Contact,
    Section::Summary,
    Section::Experience,
    Section::Education,
    Section::Skills,
    Section::Projects,
    Section::Done,
];

impl Section {
    /// The section after this one, clamped at `Done`.
    pub fn next(self) -> Section {
        let idx = SECTION_ORDER.iter().position(|s| *s == self).unwrap_or(0);
        SECTION_ORDER[(idx + 1).min(SECTION_ORDER.len() - 1)]
    }

    /// Heading used in the preview and the exported document.
    pub fn title(self) -> &'static str {
        match self {
            Section::Introduction => "Introduction",
            Section::Contact => "Contact Information",
            Section::Summary => "Professional Summary",
            Section::Experience => "Work Experience",
            Section::Education => "Education",
            Section::Skills => "Skills",
            Section::Projects => "Projects",
            Section::Done => "Done",
        }
    }

    /// Returns `true` for sections that produce a resume field.
    pub fn is_content(self) -> bool {
        !matches!(self, Section::Introduction | Section::Done)
    }
}

// ---------------------------------------------------------------------------
// Advance detection
// ---------------------------------------------------------------------------

/// Keywords that signal approval of the current section.
pub const ADVANCE_KEYWORDS: [&str; 5] = ["next", "ok", "looks good", "approve", "skip"];

/// Case-insensitive substring match against the approval keyword set.
pub fn is_advance_signal(input: &str) -> bool {
    let lower = input.to_lowercase();
    ADVANCE_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

// ---------------------------------------------------------------------------
// TurnIntent
// ---------------------------------------------------------------------------

/// What the tracker decided to do with a user submission.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnIntent {
    /// Send the input to the model as conversation for the current section.
    Converse,
    /// Move forward one section.
    Advance {
        /// The section that was left.
        from: Section,
        /// The new current section.
        to: Section,
        /// Finalized content for `from`, when `from` produces a resume field
        /// and a usable model reply existed.
        captured: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// SectionTracker
// ---------------------------------------------------------------------------

/// Tracks the active section and classifies each user submission.
#[derive(Debug, Clone)]
pub struct SectionTracker {
    current: Section,
}

impl SectionTracker {
    pub fn new() -> Self {
        Self {
            current: Section::Introduction,
        }
    }

    /// The section the conversation is currently on.
    pub fn current(&self) -> Section {
        self.current
    }

    /// Classify `input` and advance the tracker if it is an approval signal.
    ///
    /// `last_model_reply` is the content of the most recent model message
    /// before this submission; it becomes the captured section content when
    /// advancing out of a content section. Canned section prompts are never
    /// captured — only generated drafts count.
    pub fn classify(&mut self, input: &str, last_model_reply: Option<&str>) -> TurnIntent {
        if !is_advance_signal(input) {
            return TurnIntent::Converse;
        }

        match self.current {
            // Terminal: clamp, treat as conversation.
            Section::Done => TurnIntent::Converse,

            // Introduction produces no resume field.
            Section::Introduction => {
                let from = self.current;
                self.current = Section::Contact;
                TurnIntent::Advance {
                    from,
                    to: self.current,
                    captured: None,
                }
            }

            _ => {
                let from = self.current;
                self.current = self.current.next();
                TurnIntent::Advance {
                    from,
                    to: self.current,
                    captured: capture_content(last_model_reply),
                }
            }
        }
    }
}

impl Default for SectionTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn the last model reply into storable section content.
///
/// Returns `None` when there is no reply, the reply is a verbatim canned
/// prompt, or nothing remains after stripping the draft preamble.
fn capture_content(last_model_reply: Option<&str>) -> Option<String> {
    let reply = last_model_reply?;
    if prompts::is_section_prompt(reply) {
        return None;
    }
    let cleaned = clean_draft_reply(reply);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- advance detection -------------------------------------------------

    #[test]
    fn keyword_anywhere_any_case_advances() {
        assert!(is_advance_signal("OK"));
        assert!(is_advance_signal("that Looks Good to me"));
        assert!(is_advance_signal("approve it"));
        assert!(is_advance_signal("let's skip this one"));
        assert!(is_advance_signal("NEXT please"));
    }

    #[test]
    fn unrelated_input_is_conversation() {
        assert!(!is_advance_signal("add more detail about my internship"));
        assert!(!is_advance_signal(""));
    }

    // ---- section order -----------------------------------------------------

    #[test]
    fn next_walks_the_fixed_order() {
        assert_eq!(Section::Introduction.next(), Section::Contact);
        assert_eq!(Section::Contact.next(), Section::Summary);
        assert_eq!(Section::Projects.next(), Section::Done);
        // Clamped at the terminal section.
        assert_eq!(Section::Done.next(), Section::Done);
    }

    #[test]
    fn pseudo_sections_are_not_content() {
        assert!(!Section::Introduction.is_content());
        assert!(!Section::Done.is_content());
        assert!(Section::Contact.is_content());
        assert!(Section::Projects.is_content());
    }

    // ---- tracker classification --------------------------------------------

    #[test]
    fn conversation_leaves_section_unchanged() {
        let mut tracker = SectionTracker::new();
        let intent = tracker.classify("tell me more", Some("a draft"));
        assert_eq!(intent, TurnIntent::Converse);
        assert_eq!(tracker.current(), Section::Introduction);
    }

    #[test]
    fn introduction_advances_without_capture() {
        let mut tracker = SectionTracker::new();
        let intent = tracker.classify("skip", Some("some model text"));
        assert_eq!(
            intent,
            TurnIntent::Advance {
                from: Section::Introduction,
                to: Section::Contact,
                captured: None,
            }
        );
        assert_eq!(tracker.current(), Section::Contact);
    }

    #[test]
    fn contact_ok_advances_to_summary_and_captures() {
        let mut tracker = SectionTracker::new();
        tracker.classify("skip", None); // Introduction → Contact

        let intent = tracker.classify("ok", Some("Jane Doe\njane@example.com"));
        match intent {
            TurnIntent::Advance {
                from,
                to,
                captured,
            } => {
                assert_eq!(from, Section::Contact);
                assert_eq!(to, Section::Summary);
                assert_eq!(captured.as_deref(), Some("Jane Doe\njane@example.com"));
            }
            other => panic!("expected advance, got {other:?}"),
        }
        assert_eq!(tracker.current(), Section::Summary);
    }

    #[test]
    fn advance_at_done_is_a_no_op() {
        let mut tracker = SectionTracker::new();
        // Walk all the way to Done.
        for _ in 0..SECTION_ORDER.len() {
            tracker.classify("next", Some("draft"));
        }
        assert_eq!(tracker.current(), Section::Done);

        let intent = tracker.classify("next", Some("draft"));
        assert_eq!(intent, TurnIntent::Converse);
        assert_eq!(tracker.current(), Section::Done);
    }

    #[test]
    fn canned_prompt_is_never_captured() {
        let mut tracker = SectionTracker::new();
        tracker.classify("skip", None); // → Contact

        let prompt = Section::Contact.prompt();
        let intent = tracker.classify("looks good", Some(prompt));
        match intent {
            TurnIntent::Advance { captured, .. } => assert!(captured.is_none()),
            other => panic!("expected advance, got {other:?}"),
        }
    }

    #[test]
    fn last_content_section_advances_to_done() {
        let mut tracker = SectionTracker::new();
        for _ in 0..6 {
            tracker.classify("next", Some("draft"));
        }
        assert_eq!(tracker.current(), Section::Projects);

        let intent = tracker.classify("approve", Some("my projects"));
        match intent {
            TurnIntent::Advance { from, to, .. } => {
                assert_eq!(from, Section::Projects);
                assert_eq!(to, Section::Done);
            }
            other => panic!("expected advance, got {other:?}"),
        }
    }
}
