//! Thin wrapper around the Diagnostic Engine's fuzzy matcher so callers
//! across the analyzer don't each re-collect candidate name lists by hand.

use vex_diagnostics::fuzzy;

pub fn similar_names<I, S>(target: &str, candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let pool: Vec<String> = candidates.into_iter().map(|s| s.as_ref().to_string()).collect();
    fuzzy::find_similar_names(target, &pool, 0.7, 3)
}
