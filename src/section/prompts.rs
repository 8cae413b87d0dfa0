//! Canned section prompts and draft cleanup.
//!
//! Each section has a fixed prompt the assistant presents when the
//! conversation enters it. The Introduction prompt seeds the chat history on
//! startup; the others are appended when the user approves a section and the
//! flow moves forward.

use std::sync::OnceLock;

use regex::Regex;

use super::Section;

impl Section {
    /// The canned prompt presented when the conversation enters this section.
    pub fn prompt(self) -> &'static str {
        match self {
            Section::Introduction => {
                "Hello! I'm your AI Resume Architect. I'll guide you through creating a \
                 high-scoring, ATS-friendly resume.\n\nTo get started, please provide a link \
                 to your LinkedIn profile. This will give me some context to work with. If \
                 you don't have one, just say 'skip'."
            }
            Section::Contact => {
                "Great, let's start with your Contact Information. Please provide your full \
                 name, phone number, professional email address, city/state, and confirm \
                 your LinkedIn profile URL."
            }
            Section::Summary => {
                "Excellent. Now, let's craft a powerful Professional Summary. Tell me about \
                 your years of experience, key areas of expertise, and your career goals. \
                 What makes you a great candidate?"
            }
            Section::Experience => {
                "Perfect. Now for your Work Experience. Let's do one role at a time, \
                 starting with your most recent. Please provide the company name, your job \
                 title, the dates you worked there, and a few bullet points about your \
                 responsibilities and achievements. Focus on quantifiable results if \
                 possible (e.g., 'Increased sales by 15%')."
            }
            Section::Education => {
                "Your experience looks solid. Now, let's add your Education. Please list \
                 your degree, major, university, and graduation date."
            }
            Section::Skills => {
                "Almost there! Let's list your key skills. Please provide a list of your \
                 technical skills (like programming languages, software) and soft skills \
                 (like communication, leadership). You can group them by category."
            }
            Section::Projects => {
                "To make your resume stand out, let's add a Projects section. Describe a \
                 couple of your most impressive projects, including the technologies used \
                 and what you accomplished. If you don't have any to add, just say 'skip'."
            }
            Section::Done => {
                "Congratulations! We've completed all sections of your resume. Take a final \
                 look at the preview. You can ask me for final tweaks or use the download \
                 button to save your new resume."
            }
        }
    }
}

/// Returns `true` when `text` is one of the canned section prompts verbatim.
pub fn is_section_prompt(text: &str) -> bool {
    super::SECTION_ORDER.iter().any(|s| s.prompt() == text)
}

/// Strip the assistant's draft preamble/coda from a reply before storing it
/// as section content.
///
/// The assistant frames drafts as "Here is a draft for this section … say
/// 'next' to approve and move on." — that wrapper is conversation, not resume
/// content.
pub fn clean_draft_reply(reply: &str) -> String {
    static PREAMBLE: OnceLock<Regex> = OnceLock::new();
    let re = PREAMBLE.get_or_init(|| {
        Regex::new(r"(?is)here is a draft for this section.*?'next' to approve and move on\.")
            .expect("draft preamble pattern is valid")
    });
    re.replace_all(reply, "").trim().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_section_has_a_prompt() {
        for section in super::super::SECTION_ORDER {
            assert!(!section.prompt().is_empty());
        }
    }

    #[test]
    fn prompt_detection_is_verbatim_only() {
        assert!(is_section_prompt(Section::Contact.prompt()));
        assert!(!is_section_prompt("Great, let's start"));
        assert!(!is_section_prompt(""));
    }

    #[test]
    fn clean_strips_draft_preamble() {
        let reply = "Here is a draft for this section. How does this look? We can refine \
                     it further, or you can say 'next' to approve and move on.\n\nJane Doe\njane@example.com";
        assert_eq!(clean_draft_reply(reply), "Jane Doe\njane@example.com");
    }

    #[test]
    fn clean_is_case_insensitive_and_spans_lines() {
        let reply = "HERE IS A DRAFT FOR THIS SECTION,\nplease review,\nsay 'next' to approve and move on.\ncontent";
        assert_eq!(clean_draft_reply(reply), "content");
    }

    #[test]
    fn clean_leaves_plain_replies_untouched() {
        let reply = "Jane Doe — Senior Engineer";
        assert_eq!(clean_draft_reply(reply), reply);
    }

    #[test]
    fn clean_trims_whitespace() {
        assert_eq!(clean_draft_reply("  content  \n"), "content");
    }
}
