use std::sync::LazyLock;

use regex::Regex;

/// Longest summary kept, in words.
pub const MAX_SUMMARY_WORDS: usize = 10;

/// Lead-in phrases models like to open with.
const BOILERPLATE_PREFIXES: &[&str] = &[
    "Summary:",
    "Topic:",
    "Key words:",
    "Keywords:",
    "The text is about",
    "This text discusses",
    "The topic is",
    "Main topic:",
    "Subject:",
    "Theme:",
];

const TRAILING_PUNCTUATION: &[char] = &['.', '!', '?', ':', ';', ','];

static THINK_BLOCK: LazyLock<Regex> = LazyLock::new(|| match Regex::new(r"(?s)<think>.*?</think>") {
    Ok(regex) => regex,
    Err(err) => panic!("Failed to compile think block regex: {err}"),
});

static MARKUP_TAG: LazyLock<Regex> = LazyLock::new(|| match Regex::new(r"<[^>]*>") {
    Ok(regex) => regex,
    Err(err) => panic!("Failed to compile markup tag regex: {err}"),
});

/// Normalize raw model output into a short topic label.
///
/// Reasoning blocks and markup are removed, whitespace collapsed, boilerplate
/// lead-ins stripped, the result cut to [`MAX_SUMMARY_WORDS`] words and
/// trailing punctuation dropped. Applying it to its own output changes nothing.
pub fn clean_summary(raw: &str) -> String {
    let without_reasoning = remove_until_stable(&THINK_BLOCK, raw);
    let without_markup = remove_until_stable(&MARKUP_TAG, &without_reasoning);
    let collapsed = collapse_whitespace(&without_markup);
    let unprefixed = strip_boilerplate(&collapsed);

    let truncated = unprefixed
        .split_whitespace()
        .take(MAX_SUMMARY_WORDS)
        .collect::<Vec<_>>()
        .join(" ");

    trim_trailing_punctuation(&truncated).to_owned()
}

/// Removing a match can splice a new one together, so repeat until nothing
/// matches.
fn remove_until_stable(pattern: &Regex, text: &str) -> String {
    let mut current = text.to_owned();
    while pattern.is_match(&current) {
        current = pattern.replace_all(&current, "").into_owned();
    }
    current
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip the first matching prefix per pass until no prefix matches.
fn strip_boilerplate(text: &str) -> &str {
    let mut current = text.trim();
    while let Some(rest) = BOILERPLATE_PREFIXES
        .iter()
        .find_map(|prefix| strip_prefix_ignore_case(current, prefix))
    {
        current = rest.trim_start();
    }
    current
}

fn strip_prefix_ignore_case<'text>(text: &'text str, prefix: &str) -> Option<&'text str> {
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        text.get(prefix.len()..)
    } else {
        None
    }
}

fn trim_trailing_punctuation(text: &str) -> &str {
    text.trim_end_matches(|character: char| {
        character.is_whitespace() || TRAILING_PUNCTUATION.contains(&character)
    })
}
