//! Prompt construction

/// Preamble placed before every question
pub const BASE_INSTRUCTION: &str = "You are a helpful assistant for REVA University. Provide information about REVA University, its programs, facilities, and policies. Format your response using Markdown, including headings, bullet points for lists, and hyperlinks where appropriate (e.g., for website links). If you don't know the answer, state that you are not sure.\n\n";

/// Build the completion prompt, optionally grounded on `context`.
///
/// An empty context is treated as absent.
pub fn format_prompt(query: &str, context: Option<&str>) -> String {
    match context.filter(|c| !c.is_empty()) {
        Some(context) => format!(
            "{}Context: {}\n\nQuestion: {}",
            BASE_INSTRUCTION, context, query
        ),
        None => format!("{}Question: {}", BASE_INSTRUCTION, query),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_without_context() {
        let prompt = format_prompt("Where is the library?", None);
        assert!(prompt.starts_with(BASE_INSTRUCTION));
        assert!(prompt.ends_with("\n\nQuestion: Where is the library?"));
        assert!(!prompt.contains("Context:"));
    }

    #[test]
    fn prompt_with_context() {
        let prompt = format_prompt("Any news?", Some("Fest on Friday"));
        assert_eq!(
            prompt,
            format!("{}Context: Fest on Friday\n\nQuestion: Any news?", BASE_INSTRUCTION)
        );
    }

    #[test]
    fn empty_context_is_ignored() {
        assert_eq!(format_prompt("q", Some("")), format_prompt("q", None));
    }
}
