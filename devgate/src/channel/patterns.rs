//! Prompt pattern helpers.

use regex::bytes::Regex;

use crate::error::ChannelError;

/// Prompt that ends in one of the usual CLI terminators.
pub const GENERIC_PROMPT: &str = r"(?m)^[^\n]*[>#$%\]]\s*\z";

/// Compile a prompt pattern, anchoring it to the end of the output.
///
/// The anchor is `\z` so that `(?m)` patterns still only match the last
/// line. Patterns that already end in `$` are used unchanged.
pub fn compile_prompt_pattern(pattern: &str) -> Result<Regex, ChannelError> {
    let anchored = if pattern.ends_with('$') {
        pattern.to_string()
    } else {
        format!(r"{pattern}\s*\z")
    };

    Ok(Regex::new(&anchored)?)
}

/// Pattern matching any of `patterns`.
pub fn any_of<'a>(patterns: impl IntoIterator<Item = &'a Regex>) -> Result<Regex, ChannelError> {
    let joined = patterns
        .into_iter()
        .map(|p| format!("(?:{})", p.as_str()))
        .collect::<Vec<_>>()
        .join("|");
    Ok(Regex::new(&joined)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_prompt_pattern() {
        let pattern = compile_prompt_pattern(r"router#").unwrap();
        assert!(pattern.is_match(b"router# "));
        assert!(!pattern.is_match(b"router#\nmore output"));

        let pattern = compile_prompt_pattern(r"router#$").unwrap();
        assert!(pattern.is_match(b"router#"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            compile_prompt_pattern(r"router(#"),
            Err(ChannelError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_generic_prompt() {
        let pattern = Regex::new(GENERIC_PROMPT).unwrap();
        assert!(pattern.is_match(b"show version\nrouter> "));
        assert!(pattern.is_match(b"user@host:~$ "));
        assert!(pattern.is_match(b"<H3C>\n[H3C]"));
        assert!(!pattern.is_match(b"Building configuration..."));
    }

    #[test]
    fn test_any_of() {
        let exec = compile_prompt_pattern(r">").unwrap();
        let config = compile_prompt_pattern(r"\(config[^)]*\)#").unwrap();
        let both = any_of([&exec, &config]).unwrap();
        assert!(both.is_match(b"router>"));
        assert!(both.is_match(b"router(config-if)#"));
        assert!(!both.is_match(b"router#"));
    }
}
