//! Shared word-wrap layout engine (spec §4.5). Both the canvas and SDF
//! renderers lay text out through this module and differ only in how they
//! turn a [`LayoutResult`] into pixels or quads.

const ZWSP: char = '\u{200B}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordBreak {
    /// Breaks at spaces and ZWSP; never splits a word.
    Normal,
    /// May break between any two characters.
    BreakAll,
    /// Prefers space breaks, falls back to mid-word when a single word
    /// exceeds the available width.
    BreakWord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
}

#[derive(Debug, Clone)]
pub struct TextLayoutParams {
    pub text: String,
    pub line_height: f32,
    pub max_width: Option<f32>,
    pub max_height: Option<f32>,
    pub max_lines: Option<u32>,
    pub align: HorizontalAlign,
    pub valign: VerticalAlign,
    pub overflow_suffix: Option<String>,
    pub word_break: WordBreak,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaidLine {
    pub text: String,
    pub x_offset: f32,
    pub y_offset: f32,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResult {
    pub lines: Vec<LaidLine>,
    pub width: f32,
    pub height: f32,
}

/// `measure` returns the rendered width of an arbitrary string slice —
/// callers bake font size, letter spacing, and kerning into this closure.
pub fn layout_text(params: &TextLayoutParams, measure: &dyn Fn(&str) -> f32) -> LayoutResult {
    let available_width = params.max_width.unwrap_or(f32::INFINITY);

    let mut wrapped: Vec<String> = Vec::new();
    for logical_line in params.text.split('\n') {
        wrapped.extend(wrap_line(logical_line, available_width, params.word_break, measure));
    }
    if wrapped.is_empty() {
        wrapped.push(String::new());
    }

    let max_lines_by_height = params
        .max_height
        .map(|h| (h / params.line_height).floor().max(1.0) as u32);
    let line_cap = match (params.max_lines, max_lines_by_height) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    };

    let truncated = if let Some(cap) = line_cap {
        let cap = cap.max(1) as usize;
        if wrapped.len() > cap {
            let mut kept: Vec<String> = wrapped.into_iter().take(cap).collect();
            if let Some(last) = kept.last_mut() {
                *last = apply_overflow_suffix(
                    last,
                    available_width,
                    params.overflow_suffix.as_deref(),
                    measure,
                );
            }
            kept
        } else {
            wrapped
        }
    } else {
        wrapped
    };

    let widths: Vec<f32> = truncated.iter().map(|l| measure(l)).collect();
    let content_width = widths.iter().cloned().fold(0.0_f32, f32::max);
    let effective_width = params.max_width.unwrap_or(content_width);
    let content_height = truncated.len() as f32 * params.line_height;

    let y_start = match params.valign {
        VerticalAlign::Top => 0.0,
        VerticalAlign::Middle => {
            params.max_height.unwrap_or(content_height) / 2.0 - content_height / 2.0
        }
        VerticalAlign::Bottom => params.max_height.unwrap_or(content_height) - content_height,
    };

    let lines = truncated
        .into_iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (text, width))| {
            let x_offset = match params.align {
                HorizontalAlign::Left => 0.0,
                HorizontalAlign::Center => (effective_width - width) / 2.0,
                HorizontalAlign::Right => effective_width - width,
            };
            LaidLine {
                text,
                x_offset,
                y_offset: y_start + i as f32 * params.line_height,
                width,
            }
        })
        .collect();

    LayoutResult {
        lines,
        width: effective_width,
        height: params.max_height.unwrap_or(content_height),
    }
}

/// Word-wraps one logical (already `\n`-split) line.
fn wrap_line(
    line: &str,
    max_width: f32,
    mode: WordBreak,
    measure: &dyn Fn(&str) -> f32,
) -> Vec<String> {
    if line.is_empty() {
        return vec![String::new()];
    }
    if !max_width.is_finite() {
        return vec![line.to_string()];
    }

    match mode {
        WordBreak::BreakAll => wrap_break_all(line, max_width, measure),
        WordBreak::Normal => wrap_by_words(line, max_width, measure, false),
        WordBreak::BreakWord => wrap_by_words(line, max_width, measure, true),
    }
}

/// Tokenizes on spaces and ZWSP, keeping the break character attached to
/// the end of its preceding token so re-joining preserves spacing.
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in line.chars() {
        current.push(ch);
        if ch == ' ' || ch == ZWSP {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn wrap_by_words(
    line: &str,
    max_width: f32,
    measure: &dyn Fn(&str) -> f32,
    allow_mid_word_fallback: bool,
) -> Vec<String> {
    let tokens = tokenize(line);
    let mut lines = Vec::new();
    let mut current = String::new();

    for token in tokens {
        let candidate = format!("{current}{token}");
        if measure(candidate.trim_end_matches([' ', ZWSP])) <= max_width || current.is_empty() {
            if measure(token.trim_end_matches([' ', ZWSP])) > max_width
                && current.is_empty()
                && allow_mid_word_fallback
            {
                // A single token already exceeds the width: break inside it,
                // repeatedly, until the remainder fits on its own line.
                let mut remainder = token;
                loop {
                    let (head, rest) = split_token_to_fit(&remainder, max_width, measure);
                    if rest.is_empty() || measure(rest.trim_end_matches([' ', ZWSP])) <= max_width {
                        lines.push(head);
                        current = rest;
                        break;
                    }
                    lines.push(head);
                    remainder = rest;
                }
                continue;
            }
            current = candidate;
        } else {
            lines.push(
                std::mem::take(&mut current)
                    .trim_end_matches([' ', ZWSP])
                    .to_string(),
            );
            current = token;
        }
    }
    if !current.is_empty() {
        lines.push(current.trim_end_matches([' ', ZWSP]).to_string());
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn split_token_to_fit(
    token: &str,
    max_width: f32,
    measure: &dyn Fn(&str) -> f32,
) -> (String, String) {
    let chars: Vec<char> = token.chars().collect();
    let mut split_at = chars.len();
    for i in (1..=chars.len()).rev() {
        let prefix: String = chars[..i].iter().collect();
        if measure(&prefix) <= max_width {
            split_at = i;
            break;
        }
    }
    let head: String = chars[..split_at].iter().collect();
    let rest: String = chars[split_at..].iter().collect();
    (head, rest)
}

fn wrap_break_all(line: &str, max_width: f32, measure: &dyn Fn(&str) -> f32) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut lines = Vec::new();
    let mut current = String::new();
    for ch in chars {
        let candidate = format!("{current}{ch}");
        if measure(&candidate) <= max_width || current.is_empty() {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push(ch);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Re-measures `line` with `suffix` appended, trimming characters off the
/// end until it fits — applied only when the line was actually truncated
/// (design notes §9: suffix application is strictly conditional).
fn apply_overflow_suffix(
    line: &str,
    max_width: f32,
    suffix: Option<&str>,
    measure: &dyn Fn(&str) -> f32,
) -> String {
    let Some(suffix) = suffix else {
        return line.to_string();
    };
    if !max_width.is_finite() {
        return format!("{line}{suffix}");
    }
    let chars: Vec<char> = line.chars().collect();
    for take in (0..=chars.len()).rev() {
        let prefix: String = chars[..take].iter().collect();
        let candidate = format!("{prefix}{suffix}");
        if measure(&candidate) <= max_width {
            return candidate;
        }
    }
    suffix.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_width_measure(s: &str) -> f32 {
        s.chars().count() as f32 * 10.0
    }

    fn base_params(text: &str) -> TextLayoutParams {
        TextLayoutParams {
            text: text.to_string(),
            line_height: 20.0,
            max_width: None,
            max_height: None,
            max_lines: None,
            align: HorizontalAlign::Left,
            valign: VerticalAlign::Top,
            overflow_suffix: None,
            word_break: WordBreak::Normal,
        }
    }

    #[test]
    fn no_wrap_when_max_width_is_none() {
        let params = base_params("hello world");
        let result = layout_text(&params, &char_width_measure);
        assert_eq!(result.lines.len(), 1);
        assert_eq!(result.lines[0].text, "hello world");
    }

    #[test]
    fn normal_mode_breaks_at_spaces_not_mid_word() {
        let mut params = base_params("hello world");
        params.max_width = Some(70.0);
        let result = layout_text(&params, &char_width_measure);
        assert!(result.lines.len() >= 2);
        assert!(result.lines.iter().all(|l| !l.text.contains("wor")
            || l.text == "world"
            || l.text.starts_with("world")));
    }

    #[test]
    fn scenario_d_text_wrap_with_overflow_suffix() {
        let mut params = base_params("hello world test");
        params.max_width = Some(100.0);
        params.max_lines = Some(1);
        params.overflow_suffix = Some("...".to_string());
        let result = layout_text(&params, &char_width_measure);
        assert_eq!(result.lines.len(), 1);
        assert!(result.lines[0].text.ends_with("..."));
        assert!(result.lines[0].width <= 100.0);
    }

    #[test]
    fn overflow_suffix_is_not_applied_when_not_truncated() {
        let mut params = base_params("hi");
        params.max_width = Some(100.0);
        params.max_lines = Some(1);
        params.overflow_suffix = Some("...".to_string());
        let result = layout_text(&params, &char_width_measure);
        assert_eq!(result.lines[0].text, "hi");
    }

    #[test]
    fn break_all_may_split_mid_word() {
        let mut params = base_params("abcdefgh");
        params.max_width = Some(35.0);
        params.word_break = WordBreak::BreakAll;
        let result = layout_text(&params, &char_width_measure);
        assert!(result.lines.len() >= 3);
    }

    #[test]
    fn break_word_falls_back_to_mid_word_for_overlong_tokens() {
        let mut params = base_params("supercalifragilistic");
        params.max_width = Some(50.0);
        params.word_break = WordBreak::BreakWord;
        let result = layout_text(&params, &char_width_measure);
        assert!(result.lines.len() > 1);
        assert!(result.lines.iter().all(|l| l.width <= 50.0));
    }

    #[test]
    fn zwsp_is_a_zero_width_break_opportunity() {
        let text = format!("abc{ZWSP}def");
        let mut params = base_params(&text);
        params.max_width = Some(35.0);
        let result = layout_text(&params, &char_width_measure);
        assert!(result.lines.len() >= 2);
    }

    #[test]
    fn center_align_offsets_shorter_lines() {
        let mut params = base_params("hi");
        params.max_width = Some(100.0);
        params.align = HorizontalAlign::Center;
        let result = layout_text(&params, &char_width_measure);
        assert!(result.lines[0].x_offset > 0.0);
    }
}
