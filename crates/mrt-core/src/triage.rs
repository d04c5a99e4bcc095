//! URL triage for incoming message bodies.
//!
//! This is a heuristic, not a validator. Any dotted token resembling a
//! domain matches, including decimal-like strings, and URLs broken
//! across whitespace in ways the stripping does not reunite are
//! missed, as are schemes other than http/https. Accuracy limits are
//! a known property of the product, not a defect to fix here.

use once_cell::sync::Lazy;
use regex::Regex;

/// Optional http/https scheme, one or more dot-separated label groups,
/// optional path. Applied after whitespace removal.
static URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(https?://)?(\w[\w-]*\.)+\w+(/\S*)?").expect("url pattern compiles")
});

/// Test whether a message body contains a URL-like substring.
///
/// All whitespace is stripped first, so "bit. ly/x" is reunited into a
/// match while a scheme split as "http : //x.y" still matches on the
/// trailing domain token.
pub fn contains_url(body: &str) -> bool {
    let compact: String = body.chars().filter(|c| !c.is_whitespace()).collect();
    URL_PATTERN.is_match(&compact)
}
