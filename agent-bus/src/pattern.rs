//! Glob-pattern compilation and matching for event topics.
//!
//! Patterns are precompiled once at subscribe time into a `Vec<PatternSegment>`
//! so the emission path never re-parses a pattern string.

/// One token of a precompiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PatternSegment {
    /// Matches a topic segment equal to this literal.
    Literal(String),
    /// Matches exactly one topic segment, any value.
    Star,
    /// Matches zero or more trailing topic segments. Only valid as the last
    /// segment of a pattern.
    DoubleStar,
}

/// Compiles a dotted pattern string into matchable segments.
///
/// # Errors
///
/// Returns an error message if the pattern is empty, contains an empty
/// segment, or places `**` anywhere but the final position.
pub(crate) fn compile(pattern: &str) -> Result<Vec<PatternSegment>, String> {
    if pattern.is_empty() {
        return Err("pattern must not be empty".to_string());
    }

    let tokens: Vec<&str> = pattern.split('.').collect();
    let mut segments = Vec::with_capacity(tokens.len());

    for (index, token) in tokens.iter().enumerate() {
        if token.is_empty() {
            return Err("pattern must not contain an empty segment".to_string());
        }
        let is_last = index == tokens.len() - 1;
        let segment = match *token {
            "**" if !is_last => {
                return Err("`**` is only valid as the trailing segment".to_string());
            }
            "**" => PatternSegment::DoubleStar,
            "*" => PatternSegment::Star,
            literal => PatternSegment::Literal(literal.to_string()),
        };
        segments.push(segment);
    }

    Ok(segments)
}

/// Splits an event topic on both `.` and `_`, so pattern `demo.*` matches
/// topic `demo_ping`.
pub(crate) fn split_topic(topic: &str) -> Vec<&str> {
    topic.split(['.', '_']).collect()
}

/// Tests whether a precompiled pattern matches a topic already split into segments.
pub(crate) fn matches(segments: &[PatternSegment], topic_segments: &[&str]) -> bool {
    let mut seg_idx = 0;
    let mut topic_idx = 0;

    while seg_idx < segments.len() {
        match &segments[seg_idx] {
            PatternSegment::DoubleStar => return true,
            PatternSegment::Star => {
                if topic_idx >= topic_segments.len() {
                    return false;
                }
                seg_idx += 1;
                topic_idx += 1;
            }
            PatternSegment::Literal(literal) => {
                if topic_segments.get(topic_idx) != Some(&literal.as_str()) {
                    return false;
                }
                seg_idx += 1;
                topic_idx += 1;
            }
        }
    }

    topic_idx == topic_segments.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(pattern: &str, topic: &str) -> bool {
        let segments = compile(pattern).unwrap();
        let topic_segments = split_topic(topic);
        matches(&segments, &topic_segments)
    }

    #[test]
    fn star_matches_one_segment() {
        assert!(run("demo.*", "demo_ping"));
        assert!(!run("demo.*", "system_status"));
    }

    #[test]
    fn literal_must_match_exactly() {
        assert!(run("demo.ping", "demo.ping"));
        assert!(!run("demo.ping", "demo.pong"));
    }

    #[test]
    fn double_star_matches_zero_or_more_trailing_segments() {
        assert!(run("demo.**", "demo"));
        assert!(run("demo.**", "demo_ping"));
        assert!(run("demo.**", "demo_ping_extra"));
        assert!(!run("demo.**", "system_status"));
    }

    #[test]
    fn double_star_must_be_trailing() {
        assert!(compile("**.demo").is_err());
    }

    #[test]
    fn empty_segment_is_rejected() {
        assert!(compile("demo..ping").is_err());
    }

    #[test]
    fn star_does_not_match_extra_segments() {
        assert!(!run("demo.*", "demo_ping_extra"));
    }
}
