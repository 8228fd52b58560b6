use serde::de::DeserializeOwned;

/// Parse a JSON object out of a model reply.
///
/// Models wrap JSON in code fences or chatter, so this looks at the span
/// from the first `{` to the last `}`. Returns `None` when that span does
/// not deserialize into `T`.
pub fn parse_json_object<T: DeserializeOwned>(content: &str) -> Option<T> {
    let json_str = match (content.find('{'), content.rfind('}')) {
        (Some(start), Some(end)) if start < end => &content[start..=end],
        _ => content,
    };

    match serde_json::from_str::<T>(json_str) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Failed to parse structured output: {e}. Raw: {content}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Keyword {
        search_keyword: String,
    }

    #[test]
    fn test_parse_clean_object() {
        let parsed: Option<Keyword> = parse_json_object(r#"{"search_keyword": "election 2024"}"#);
        assert_eq!(parsed.unwrap().search_keyword, "election 2024");
    }

    #[test]
    fn test_parse_object_in_code_fence() {
        let input = "```json\n{\"search_keyword\": \"cricket world cup\"}\n```";
        let parsed: Option<Keyword> = parse_json_object(input);
        assert_eq!(parsed.unwrap().search_keyword, "cricket world cup");
    }

    #[test]
    fn test_parse_object_with_chatter() {
        let input = "Sure! Here you go: {\"search_keyword\": \"x\"} Hope it helps.";
        let parsed: Option<Keyword> = parse_json_object(input);
        assert!(parsed.is_some());
    }

    #[test]
    fn test_parse_missing_field_is_none() {
        let parsed: Option<Keyword> = parse_json_object(r#"{"keyword": "x"}"#);
        assert!(parsed.is_none());
    }

    #[test]
    fn test_parse_garbage_is_none() {
        let parsed: Option<Keyword> = parse_json_object("I can't see any image.");
        assert!(parsed.is_none());
    }

    #[test]
    fn test_parse_unicode_values() {
        let parsed: Option<Keyword> = parse_json_object(r#"{"search_keyword": "ভাষা আন্দোলন"}"#);
        assert_eq!(parsed.unwrap().search_keyword, "ভাষা আন্দোলন");
    }
}
