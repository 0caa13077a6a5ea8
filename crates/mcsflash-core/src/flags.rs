//! Build flag tokenizer
//!
//! SDCC takes long options with a separate value (`--model-large` is a
//! switch, but `--code-loc 0x2000` is an option/value pair). The build
//! engine cannot know which of these belong together, so the raw flag line
//! is split here into two halves:
//!
//! - `recognized`: `--option value` pairs, appended to the compiler flags
//! - `passthrough`: every other token, forwarded unchanged
//!
//! Tokenization is purely syntactic. Option names are not validated.

use crate::error::{Error, Result};

/// Flags split into option/value pairs and opaque tokens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFlags {
    /// Long options paired with their value, flattened in input order
    pub recognized: Vec<String>,
    /// Remaining tokens in input order
    pub passthrough: Vec<String>,
}

impl ParsedFlags {
    /// Returns true if neither half holds a token
    pub fn is_empty(&self) -> bool {
        self.recognized.is_empty() && self.passthrough.is_empty()
    }
}

/// Split a flag string on single spaces and classify the tokens
///
/// A token starting with `--` that is directly followed by a token not
/// starting with `-` forms a pair and both move to `recognized`. All other
/// tokens go to `passthrough`. Empty input is rejected.
///
/// # Example
///
/// ```
/// use mcsflash_core::flags::parse_flags;
///
/// let parsed = parse_flags("--opt value -x").unwrap();
/// assert_eq!(parsed.recognized, ["--opt", "value"]);
/// assert_eq!(parsed.passthrough, ["-x"]);
/// ```
pub fn parse_flags(flags: &str) -> Result<ParsedFlags> {
    if flags.is_empty() {
        return Err(Error::InvalidArgument("flag string is empty".into()));
    }

    let mut parsed = ParsedFlags::default();
    let mut pending: Option<&str> = None;

    for token in flags.split(' ') {
        match pending.take() {
            Some(prev) if prev.starts_with("--") && !token.starts_with('-') => {
                parsed.recognized.push(prev.to_string());
                parsed.recognized.push(token.to_string());
            }
            Some(prev) => {
                parsed.passthrough.push(prev.to_string());
                pending = Some(token);
            }
            None => pending = Some(token),
        }
    }

    // dangling token
    if let Some(last) = pending {
        parsed.passthrough.push(last.to_string());
    }

    log::trace!(
        "Parsed flags {:?}: recognized={:?} passthrough={:?}",
        flags,
        parsed.recognized,
        parsed.passthrough
    );

    Ok(parsed)
}

/// Join flag fragments with single spaces and tokenize the result
pub fn parse_flag_list<S: AsRef<str>>(flags: &[S]) -> Result<ParsedFlags> {
    let joined = flags
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ");
    parse_flags(&joined)
}
