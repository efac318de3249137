//! Shared helpers for hooks
//!
//! Untyped metadata lives as `"key:value"` strings where keys may carry a
//! Z-index suffix `key{N}`. The patch function below is the single authority
//! on how those slices change.

/// Modes understood by `patch_keyvalue_slice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchMode {
    /// Add or update. A bare key that already has any slot gets the next
    /// free Z-index appended; a Z-indexed key overwrites its exact slot.
    Upsert,
    /// Remove every slot of the key's base, ignoring Z-index annotations.
    ClearFuzzy,
    /// Remove only the entry whose key matches character-for-character.
    ClearExact,
    /// Return the slots of the key's base without modifying anything.
    Read,
}

impl PatchMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UPSERT" => Some(Self::Upsert),
            "CLEARFUZZY" => Some(Self::ClearFuzzy),
            "CLEAREXACT" => Some(Self::ClearExact),
            "READ" => Some(Self::Read),
            _ => None,
        }
    }
}

/// Split a stored `"key:value"` entry. The value may itself contain colons.
pub fn split_key_value(entry: &str) -> (&str, &str) {
    match entry.split_once(':') {
        Some((k, v)) => (k, v),
        None => (entry, ""),
    }
}

/// Strip a trailing `{N}` Z-index annotation from a key.
pub fn key_base(key: &str) -> &str {
    if let Some(open) = key.rfind('{') {
        if key.ends_with('}') && key[open + 1..key.len() - 1].parse::<u32>().is_ok() {
            return &key[..open];
        }
    }
    key
}

/// The Z-index of a key, if it carries one.
fn key_index(key: &str) -> Option<u32> {
    let open = key.rfind('{')?;
    if !key.ends_with('}') {
        return None;
    }
    key[open + 1..key.len() - 1].parse().ok()
}

/// Apply one patch operation to a key/value slice, returning the new slice.
pub fn patch_keyvalue_slice(
    entries: Vec<String>,
    mode: PatchMode,
    key: &str,
    value: &str,
) -> Vec<String> {
    match mode {
        PatchMode::Upsert => upsert(entries, key, value),
        PatchMode::ClearFuzzy => {
            let base = key_base(key);
            entries
                .into_iter()
                .filter(|e| key_base(split_key_value(e).0) != base)
                .collect()
        }
        PatchMode::ClearExact => entries
            .into_iter()
            .filter(|e| split_key_value(e).0 != key)
            .collect(),
        PatchMode::Read => {
            if key.is_empty() {
                return entries;
            }
            let base = key_base(key);
            entries
                .into_iter()
                .filter(|e| key_base(split_key_value(e).0) == base)
                .collect()
        }
    }
}

fn upsert(mut entries: Vec<String>, key: &str, value: &str) -> Vec<String> {
    if key_index(key).is_some() {
        // Z-indexed key addresses its exact slot.
        for e in entries.iter_mut() {
            if split_key_value(e).0 == key {
                *e = format!("{key}:{value}");
                return entries;
            }
        }
        entries.push(format!("{key}:{value}"));
        return entries;
    }

    // Bare key: first write takes the bare slot, later writes get the next
    // free Z-index so earlier values are preserved.
    let occupied: Vec<u32> = entries
        .iter()
        .filter(|e| key_base(split_key_value(e).0) == key)
        .filter_map(|e| key_index(split_key_value(e).0))
        .collect();
    let base_taken = entries
        .iter()
        .any(|e| key_base(split_key_value(e).0) == key);

    if !base_taken {
        entries.push(format!("{key}:{value}"));
        return entries;
    }

    let mut n = 0;
    while occupied.contains(&n) {
        n += 1;
    }
    entries.push(format!("{key}{{{n}}}:{value}"));
    entries
}

/// Merge `add` into `base`, preserving order and dropping duplicates.
pub fn dedup_union(base: &[String], add: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(base.len() + add.len());
    for s in base.iter().chain(add.iter()) {
        if !out.contains(s) {
            out.push(s.clone());
        }
    }
    out
}

/// Entries of `base` that do not appear in `remove`.
pub fn subtract(base: &[String], remove: &[String]) -> Vec<String> {
    base.iter()
        .filter(|s| !remove.contains(s))
        .cloned()
        .collect()
}
