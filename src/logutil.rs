//! Helpers for putting chat narration into log lines.
//!
//! Battle logs are multi-line and use `**bold**` markup meant for the chat
//! client. Before they reach the log they are flattened to one line, stripped
//! of markup and capped in length.

use std::fmt::Write;

/// Longest preview written to the log, in characters.
pub const MAX_PREVIEW: usize = 300;

/// Escape and cap `s` at [`MAX_PREVIEW`] characters.
pub fn escape_log(s: &str) -> String {
    escape_log_with(s, MAX_PREVIEW)
}

/// Flatten `s` to a single line: newlines, tabs, backslashes and other control
/// characters are escaped, chat bold markers are dropped, and anything past
/// `max` characters is replaced by an ellipsis.
pub fn escape_log_with(s: &str, max: usize) -> String {
    let plain = s.replace("**", "");
    let mut out = String::with_capacity(plain.len().min(max) + 8);
    for (count, ch) in plain.chars().enumerate() {
        if count >= max {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_battle_narration() {
        let s = "**Battle log**\n**Alice** hit **Bob**\tok";
        assert_eq!(escape_log(s), "Battle log\\nAlice hit Bob\\tok");
    }

    #[test]
    fn caps_long_logs() {
        let s = "x".repeat(50);
        let out = escape_log_with(&s, 10);
        assert_eq!(out.chars().count(), 11);
        assert!(out.ends_with('…'));
    }
}
