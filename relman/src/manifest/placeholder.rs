//! Placeholder sentinels and identity-format checks

/// Written in place of an identity the creator could not resolve
pub const PLACEHOLDER: &str = "NEEDS_REPLACEMENT";

const SENTINELS: &[&str] = &[
    "needs_replacement",
    "needs replacement",
    "needs-replacement",
    "replace_me",
    "replace-me",
    "changeme",
    "tbd",
    "todo",
];

/// Whether a value marks a field pending manual completion
pub fn is_placeholder(value: &str) -> bool {
    let normalized = value.trim().to_ascii_lowercase();
    normalized.is_empty()
        || SENTINELS.contains(&normalized.as_str())
        || (normalized.starts_with('<') && normalized.ends_with('>'))
}

/// Full 40-character lowercase hex git SHA
pub fn is_commit_sha(value: &str) -> bool {
    value.len() == 40 && is_lower_hex(value)
}

/// Content-addressed image digest (`sha256:` + 64 lowercase hex)
pub fn is_image_digest(value: &str) -> bool {
    value
        .strip_prefix("sha256:")
        .map(|hex| hex.len() == 64 && is_lower_hex(hex))
        .unwrap_or(false)
}

/// Semver-like release version, optionally `v`-prefixed (`v1.2.0`, `1.2.0-rc1`)
pub fn is_semver_like(value: &str) -> bool {
    let core = value.strip_prefix('v').unwrap_or(value);
    let (numbers, pre) = match core.split_once('-') {
        Some((numbers, pre)) => (numbers, Some(pre)),
        None => (core, None),
    };

    let parts: Vec<&str> = numbers.split('.').collect();
    let numeric = parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
    let pre_ok = pre
        .map(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'.'))
        .unwrap_or(true);

    numeric && pre_ok
}

fn is_lower_hex(value: &str) -> bool {
    value.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
