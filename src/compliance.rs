//! Set arithmetic between detected labels and a site's required items.

use std::collections::{BTreeSet, HashSet};

/// Keep only the detected labels that are required on the site.
pub fn filter_required<'a, S: AsRef<str>>(detected: &'a [S], required: &[String]) -> Vec<&'a str> {
    let required: HashSet<&str> = required.iter().map(String::as_str).collect();
    detected
        .iter()
        .map(AsRef::<str>::as_ref)
        .filter(|label| required.contains(label))
        .collect()
}

/// Required labels with zero occurrences among the detections.
///
/// The result is the set difference `required - detected`, listed in the
/// order the items appear in `required` with duplicates collapsed.
pub fn missing_items<S: AsRef<str>>(detected: &[S], required: &[String]) -> Vec<String> {
    let present: HashSet<&str> = detected.iter().map(AsRef::<str>::as_ref).collect();
    let mut seen = HashSet::new();
    required
        .iter()
        .filter(|item| !present.contains(item.as_str()))
        .filter(|item| seen.insert(item.as_str()))
        .cloned()
        .collect()
}

/// Distinct labels in sorted order, for show-all mode.
pub fn unique_labels<S: AsRef<str>>(detected: &[S]) -> Vec<String> {
    detected
        .iter()
        .map(|label| AsRef::<str>::as_ref(label).to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
