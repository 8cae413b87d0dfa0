//! System instruction and request-body construction for the chat stream.

use serde_json::{json, Value};

use crate::chat::ChatMessage;
use crate::section::Section;

/// The fixed system instruction sent with every chat request.
pub const SYSTEM_INSTRUCTION: &str = "\
You are an expert career coach and professional resume writer specializing in creating \
high-scoring, ATS-friendly resumes. Your persona is encouraging, professional, and helpful.
Your primary goal is to guide the user section-by-section to build their resume.
The user may provide a LinkedIn profile URL for context. Use this information to inform the resume content.
For each section:
1.  You have already prompted the user for information.
2.  Based on the user's raw text, you must generate a polished, professional, and concise resume entry.
3.  Use Google Search grounding to find the most relevant, up-to-date keywords and industry-standard phrasing for the user's role and industry.
4.  Use strong action verbs and focus on quantifiable achievements. Format experience with bullet points. For skills, group them logically.
5.  After generating the text, present it clearly to the user and ask for feedback. Frame it as a draft, for example: \"Here is a draft for this section... How does this look? We can refine it further, or you can say 'next' to approve and move on.\"
6.  If the user provides feedback or asks for a change, incorporate it and provide a new version.
7.  Do not move on to the next section until the user explicitly says 'next', 'ok', 'looks good', 'approve', or something similar.
8.  Keep your responses focused on the current resume section.
";

/// Build the `streamGenerateContent` request body: ordered prior turns, the
/// new user text, the fixed system instruction tagged with the current
/// section, and the search-grounding tool flag.
pub fn build_stream_request(history: &[ChatMessage], user_text: &str, section: Section) -> Value {
    let mut contents: Vec<Value> = history
        .iter()
        .map(|msg| {
            json!({
                "role": msg.role.wire_name(),
                "parts": [{ "text": msg.content }],
            })
        })
        .collect();
    contents.push(json!({
        "role": "user",
        "parts": [{ "text": user_text }],
    }));

    json!({
        "contents": contents,
        "systemInstruction": {
            "parts": [{ "text": section_instruction(section) }],
        },
        "tools": [{ "google_search": {} }],
    })
}

/// The system instruction plus the current-section tag.
fn section_instruction(section: Section) -> String {
    format!(
        "{SYSTEM_INSTRUCTION}\nThe section currently being worked on is: {}.",
        section.title()
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatMessage;

    #[test]
    fn request_orders_history_before_new_text() {
        let history = vec![ChatMessage::model("hello"), ChatMessage::user("hi")];
        let body = build_stream_request(&history, "my name is Jane", Section::Contact);

        let contents = body["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "model");
        assert_eq!(contents[1]["role"], "user");
        assert_eq!(contents[2]["role"], "user");
        assert_eq!(contents[2]["parts"][0]["text"], "my name is Jane");
    }

    #[test]
    fn request_carries_grounding_tool_and_instruction() {
        let body = build_stream_request(&[], "hi", Section::Summary);

        assert!(body["tools"][0].get("google_search").is_some());
        let instruction = body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap();
        assert!(instruction.contains("resume writer"));
        assert!(instruction.contains("Professional Summary"));
    }
}
