//! Extracts text-only content from thread messages and trims it to a
//! token budget before handing it to the naming model.

use cp_mirror::ThreadMessage;
use serde_json::Value as Json;

/// A message's content may be a string or an array of typed blocks
/// `{type:"text", text}`; only text is extracted, joined with spaces.
fn extract_text(content: &Json) -> String {
    match content {
        Json::String(s) => s.clone(),
        Json::Array(blocks) => blocks
            .iter()
            .filter_map(|b| b.get("text").and_then(Json::as_str))
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

/// Joins `role: text` lines for every message, then drops the oldest
/// messages (keeping at least 5) until the approximate token count
/// (characters / 4) fits `token_budget`.
pub fn build_conversation(messages: &[ThreadMessage], token_budget: usize) -> String {
    let mut lines: Vec<String> = messages
        .iter()
        .filter_map(|m| {
            let text = extract_text(&m.content);
            (!text.trim().is_empty()).then(|| format!("{}: {text}", m.role))
        })
        .collect();

    while lines.len() > 5 && approx_tokens(&lines) > token_budget {
        lines.remove(0);
    }

    lines.join("\n")
}

fn approx_tokens(lines: &[String]) -> usize {
    lines.iter().map(|l| l.len()).sum::<usize>() / 4
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn msg(role: &str, content: Json) -> ThreadMessage {
        ThreadMessage {
            role: role.to_string(),
            content,
        }
    }

    #[test]
    fn extracts_text_from_string_content() {
        let messages = vec![msg("user", json!("hello there"))];
        assert_eq!(build_conversation(&messages, 10_000), "user: hello there");
    }

    #[test]
    fn extracts_text_from_block_content() {
        let messages = vec![msg("assistant", json!([{"type": "text", "text": "hi"}, {"type": "image", "url": "x"}]))];
        assert_eq!(build_conversation(&messages, 10_000), "assistant: hi");
    }

    #[test]
    fn keeps_at_least_five_messages_even_over_budget() {
        let messages: Vec<ThreadMessage> = (0..10).map(|i| msg("user", json!(format!("message number {i} with some padding text")))).collect();
        let result = build_conversation(&messages, 1);
        assert_eq!(result.lines().count(), 5);
    }
}
