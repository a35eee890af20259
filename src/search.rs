use crate::paths::format_entry_label;
use crate::store::Entry;

pub const DEFAULT_MATCH_THRESHOLD: usize = 3;

pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j]
            } else {
                1 + prev[j].min(prev[j + 1]).min(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

pub fn is_match(label: &str, query: &str, threshold: usize) -> bool {
    let label = label.to_lowercase();
    let query = query.to_lowercase();
    label.contains(&query) || edit_distance(&label, &query) <= threshold
}

pub fn filter_entries(entries: &[Entry], query: &str, threshold: usize) -> Vec<Entry> {
    if query.is_empty() {
        return entries.to_vec();
    }
    entries
        .iter()
        .filter(|e| is_match(&format_entry_label(&e.name, e.is_dir), query, threshold))
        .cloned()
        .collect()
}
