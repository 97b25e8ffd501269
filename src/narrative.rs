//! Best-effort parsers for the free-text mood and editing narratives.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{EditingStep, MoodEntry};

const REASON_LOOKAHEAD: usize = 2;

fn bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:(?:[-*•#>]|\d+[.)])\s*)+").expect("valid regex"))
}

/// List markers only. A `*` bullet needs trailing whitespace so `**` emphasis survives.
fn list_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:(?:[-•>]|\d+[.)])\s*|\*\s+)+").expect("valid regex"))
}

fn emphasis_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:\*\*([^*]+)\*\*|__([^_]+)__)\s*[:\-–—]?\s*(.*)$").expect("valid regex")
    })
}

fn step_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^\**\s*(?:step\s*\d+|\d+:)").expect("valid regex"))
}

/// Removes paired emphasis markers (`**`, `__`).
pub fn strip_emphasis(text: &str) -> String {
    text.replace("**", "").replace("__", "")
}

fn strip_bullet(line: &str) -> &str {
    let trimmed = line.trim();
    match bullet_re().find(trimmed) {
        Some(m) => &trimmed[m.end()..],
        None => trimmed,
    }
}

/// `key: value` lines of the mood narrative, decoration stripped, in input
/// order.
pub fn parse_mood_entries(narrative: &str) -> Vec<MoodEntry> {
    narrative.lines().filter_map(parse_mood_line).collect()
}

fn parse_mood_line(line: &str) -> Option<MoodEntry> {
    let (label, value) = strip_bullet(line).split_once(':')?;
    let label = strip_emphasis(label).trim_matches(|c: char| c == '*' || c.is_whitespace()).to_string();
    let value = strip_emphasis(value).trim_matches(|c: char| c == '*' || c.is_whitespace()).to_string();
    // "https://..." is not a key/value pair
    if label.is_empty() || value.is_empty() || value.starts_with("//") {
        return None;
    }
    Some(MoodEntry { label, value })
}

fn non_blank_lines(narrative: &str) -> Vec<&str> {
    narrative.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
}

fn strip_list_marker(line: &str) -> &str {
    let trimmed = line.trim();
    match list_marker_re().find(trimmed) {
        Some(m) => trimmed[m.end()..].trim_start(),
        None => trimmed,
    }
}

fn is_reason_line(line: &str) -> bool {
    strip_emphasis(strip_bullet(line)).trim_start().to_lowercase().starts_with("reason")
}

fn emphasis_step(line: &str) -> Option<String> {
    let caps = emphasis_label_re().captures(strip_list_marker(line))?;
    let label = caps.get(1).or_else(|| caps.get(2))?.as_str();
    let label = label.trim().trim_end_matches(':').trim();
    let rest = strip_emphasis(caps.get(3).map_or("", |m| m.as_str()));
    let rest = rest.trim();
    if label.is_empty() || rest.is_empty() || label.to_lowercase().starts_with("reason") {
        return None;
    }
    Some(format!("{label}: {rest}"))
}

fn prefixed_step(line: &str) -> Option<String> {
    let line = strip_list_marker(line);
    step_prefix_re().is_match(line).then(|| strip_emphasis(line).trim().to_string())
}

fn collect_steps(lines: &[&str], detect: impl Fn(&str) -> Option<String>) -> Vec<EditingStep> {
    let mut steps = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let Some(instruction) = detect(line) else { continue };
        let reason = lines
            .iter()
            .skip(i + 1)
            .take(REASON_LOOKAHEAD)
            .take_while(|next| detect(next).is_none())
            .find(|next| is_reason_line(next))
            .map(|next| strip_emphasis(strip_bullet(next)).trim().to_string());
        steps.push(EditingStep { instruction, reason });
    }
    steps
}

/// Editing steps found in the narrative. Empty when neither heuristic
/// matches; the renderer supplies the fallback box.
pub fn parse_editing_steps(narrative: &str) -> Vec<EditingStep> {
    let lines = non_blank_lines(narrative);
    let steps = collect_steps(&lines, emphasis_step);
    if !steps.is_empty() {
        return steps;
    }
    collect_steps(&lines, prefixed_step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(label: &str, value: &str) -> MoodEntry {
        MoodEntry { label: label.into(), value: value.into() }
    }

    #[test]
    fn mood_bullets_are_stripped() {
        assert_eq!(
            parse_mood_entries("- Lighting: warm\n- Mood: joyful"),
            vec![entry("Lighting", "warm"), entry("Mood", "joyful")]
        );
    }

    #[test]
    fn mood_emphasis_and_numbering_are_stripped() {
        let text = "### Overview\n1. **Scene:** beach at dusk\n* **Colors**: teal, orange\nplain sentence without pair\nhttps://example.com/ref";
        assert_eq!(
            parse_mood_entries(text),
            vec![entry("Scene", "beach at dusk"), entry("Colors", "teal, orange")]
        );
    }

    #[test]
    fn mood_without_pairs_is_empty() {
        assert!(parse_mood_entries("just a description\n\n").is_empty());
    }

    #[test]
    fn step_and_reason_prefix_form() {
        assert_eq!(
            parse_editing_steps("Step 1: brighten shadows\nReason: improves depth"),
            vec![EditingStep {
                instruction: "Step 1: brighten shadows".into(),
                reason: Some("Reason: improves depth".into()),
            }]
        );
    }

    #[test]
    fn emphasis_labels_are_preferred() {
        let text = "**Basic Panel**\n- **Exposure:** +0.3\n  **Reason:** lifts the subject\n\n- **Contrast** – -10\nStep 9: ignored because labels matched";
        assert_eq!(
            parse_editing_steps(text),
            vec![
                EditingStep { instruction: "Exposure: +0.3".into(), reason: Some("Reason: lifts the subject".into()) },
                EditingStep { instruction: "Contrast: -10".into(), reason: None },
            ]
        );
    }

    #[test]
    fn reason_lookahead_is_limited_to_two_lines() {
        let text = "Step 1: Vignette – 20\nnote a\nnote b\nReason: too far away";
        assert_eq!(parse_editing_steps(text)[0].reason, None);

        let text = "**Step 1:** Vignette – 20\nnote a\nReason: close enough";
        assert_eq!(parse_editing_steps(text)[0].reason.as_deref(), Some("Reason: close enough"));
    }

    #[test]
    fn reason_is_not_borrowed_from_next_step() {
        let text = "Step 1: Crop\nStep 2: Grain – 10\nReason: film look";
        let steps = parse_editing_steps(text);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].reason, None);
        assert_eq!(steps[1].reason.as_deref(), Some("Reason: film look"));
    }

    #[test]
    fn numeric_colon_prefix_and_emphasis_wrapped_step() {
        let steps = parse_editing_steps("**Step 2: Highlights – -15**\n3: Shadows +20");
        assert_eq!(steps[0].instruction, "Step 2: Highlights – -15");
        assert_eq!(steps[1].instruction, "3: Shadows +20");
    }

    #[test]
    fn star_bulleted_steps_are_recognised() {
        let text = "* **Exposure:** +0.3\n* **Reason:** brighter face\n*   __Warmth__ – +5";
        assert_eq!(
            parse_editing_steps(text),
            vec![
                EditingStep { instruction: "Exposure: +0.3".into(), reason: Some("Reason: brighter face".into()) },
                EditingStep { instruction: "Warmth: +5".into(), reason: None },
            ]
        );

        let steps = parse_editing_steps("* Step 1: Exposure – +10\n* 2: Contrast – -5");
        assert_eq!(steps[0].instruction, "Step 1: Exposure – +10");
        assert_eq!(steps[1].instruction, "2: Contrast – -5");
    }

    #[test]
    fn no_matching_lines_yields_no_steps() {
        assert!(parse_editing_steps("Make it look nice.\nAdd some warmth.").is_empty());
        assert!(parse_editing_steps("").is_empty());
    }
}
