//! Behavior instruction sent with every conversational request.
//!
//! The renderer understands exactly four markers; the instruction asks the
//! backend to stay inside them.

/// Markers the renderer understands, as `(marker, meaning)`.
pub const RESPONSE_MARKERS: [(&str, &str); 4] = [
    ("###", "section headers"),
    ("**Text**", "emphasis"),
    ("* or -", "bulleted lists"),
    ("1. 2. 3.", "numbered lists"),
];

/// Instruction for a conversation with the named model.
pub fn response_instruction(model_name: &str) -> String {
    let mut prompt = format!(
        "You are the executive response engine for the \"{model_name}\" model.\n\
Format responses using only these Markdown markers:\n"
    );
    for (marker, meaning) in RESPONSE_MARKERS {
        prompt.push_str(&format!("- Use {marker} for {meaning}.\n"));
    }
    prompt.push_str(
        "Indent list items for sub-bullets if necessary. \
Be precise, technical, and professional.",
    );
    prompt
}
