//! Text gate between a comment generator and the guidance store.
//!
//! Generators tend to answer with reasoning blocks, a filler opener, some
//! monologue and only then the actual sentence. Everything here is a pure
//! function over `&str`; callers decide what to do with a rejection.

/// Reasoning block delimiters, in priority order
const THINK_DELIMITERS: &[(&str, &str)] = &[("<think>", "</think>"), ("[THINK]", "[/THINK]")];

const COMMENT_OPEN: &str = "<comment>";
const COMMENT_CLOSE: &str = "</comment>";

/// Openers of a throwaway first line (compared lower-cased)
const PREAMBLE_OPENERS: &[&str] = &[
    "let's ",
    "here's ",
    "here is ",
    "i'll ",
    "i will ",
    "okay, ",
    "ok, ",
    "sure, ",
    "sure! ",
    "alright, ",
    "certainly, ",
    "to answer ",
    "let me ",
];

/// Function words a finished sentence never ends on
const DANGLING_WORDS: &[&str] = &["of", "in", "for", "from", "with", "to", "a", "an", "the"];

const SELF_REFERENCES: &[&str] = &[
    "this function",
    "this method",
    "this class",
    "this struct",
    "this type",
    "this module",
];

const GENERIC_NOUNS: &[&str] = &[
    "function",
    "method",
    "helper",
    "util",
    "utility",
    "handler",
    "callback",
    "wrapper",
    "implementation",
];

const MAX_GENERIC_NOUN_LEN: usize = 20;

/// Generator chatter that must never reach the store
const LEFTOVER_PHRASES: &[&str] = &[
    "here's a",
    "i'll ",
    "we need ",
    "let's think",
    "let me think",
    "i need to ",
    "the user wants",
];

/// Reasoning preambles that mark a stored comment as leaked (compared lower-cased)
const LEAKED_PREFIXES: &[&str] = &[
    "we need to write",
    "we need to describe",
    "let's write",
    "let's describe",
    "write a one-sentence",
    "i need to write",
    "the user wants",
];

const LEAK_WINDOW_CHARS: usize = 30;

/// Remove a reasoning block.
///
/// A closed block yields whatever follows the closer (leading spaces and
/// newlines dropped). An unterminated block swallows the rest of the text,
/// leaving only what preceded the opener. Without an opener the input is
/// returned as is.
#[must_use]
pub fn strip_think_block(text: &str) -> &str {
    let found = THINK_DELIMITERS
        .iter()
        .filter_map(|&(open, close)| text.find(open).map(|at| (at, open, close)))
        .min_by_key(|&(at, _, _)| at);

    let Some((at, open, close)) = found else {
        return text;
    };

    let body_start = at + open.len();
    match text[body_start..].find(close) {
        Some(rel) => text[body_start + rel + close.len()..].trim_start_matches([' ', '\n']),
        None => text[..at].trim(),
    }
}

/// Drop a filler first line ("Here's the comment:", "Okay, so ...").
#[must_use]
pub fn strip_preamble(text: &str) -> &str {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return trimmed;
    }

    let (first_line, rest) = match trimmed.split_once('\n') {
        Some((first, rest)) => (first, rest),
        None => (trimmed, ""),
    };

    if starts_with_any_ignore_case(first_line, PREAMBLE_OPENERS) {
        rest.trim()
    } else {
        trimmed
    }
}

/// Pull the answer out of `<comment>...</comment>`.
///
/// Anything outside the first delimited segment is ignored.
#[must_use]
pub fn extract_comment_tag(text: &str) -> Option<&str> {
    let open = text.find(COMMENT_OPEN)?;
    let body_start = open + COMMENT_OPEN.len();
    let close = text[body_start..].find(COMMENT_CLOSE)?;
    let inner = text[body_start..body_start + close].trim();
    (!inner.is_empty()).then_some(inner)
}

/// Whether a candidate comment should be thrown away.
///
/// Expects text that already went through [`strip_think_block`] and
/// [`strip_preamble`].
#[must_use]
pub fn is_malformed_response(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return true;
    }

    // Truncated mid-sentence.
    let tail = trimmed.trim_end_matches(['.', '?', ' ', '\t']);
    if let Some(last_word) = tail.split_whitespace().next_back() {
        if DANGLING_WORDS
            .iter()
            .any(|word| last_word.eq_ignore_ascii_case(word))
        {
            return true;
        }
    }

    if trimmed.ends_with('?') {
        return true;
    }

    let without_periods = trimmed.trim_end_matches('.');
    if SELF_REFERENCES
        .iter()
        .any(|phrase| without_periods.eq_ignore_ascii_case(phrase))
    {
        return true;
    }

    if !trimmed.contains(' ')
        && trimmed.chars().count() <= MAX_GENERIC_NOUN_LEN
        && GENERIC_NOUNS
            .iter()
            .any(|noun| trimmed.eq_ignore_ascii_case(noun))
    {
        return true;
    }

    let lowered = trimmed.to_lowercase();
    LEFTOVER_PHRASES
        .iter()
        .any(|phrase| lowered.contains(phrase))
}

/// Whether a comment loaded from storage is really a leaked reasoning preamble.
///
/// Narrower than [`is_malformed_response`]: only the opening characters are
/// inspected, so legitimate docs that merely mention these words survive.
#[must_use]
pub fn is_leaked_prompt(text: &str) -> bool {
    let window: String = text
        .trim_start()
        .chars()
        .take(LEAK_WINDOW_CHARS)
        .collect::<String>()
        .to_lowercase();
    LEAKED_PREFIXES
        .iter()
        .any(|prefix| window.starts_with(prefix))
}

/// Turn raw generator output into a comment, or `None` when it is unusable.
///
/// With `expect_comment_tag` the delimited answer is extracted before the
/// quality check, so monologue around the tag never counts against it.
#[must_use]
pub fn sanitize_generated(raw: &str, expect_comment_tag: bool) -> Option<String> {
    let stripped = strip_preamble(strip_think_block(raw));
    let candidate = if expect_comment_tag {
        extract_comment_tag(stripped)?
    } else {
        stripped
    };

    if is_malformed_response(candidate) {
        log::debug!("rejected generated comment: {candidate:?}");
        return None;
    }
    Some(candidate.to_string())
}

fn starts_with_any_ignore_case(text: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| {
        text.get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    })
}
