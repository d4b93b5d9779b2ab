use sha2::{Digest, Sha256};

const HASH_LENGTH: usize = 26;

/// Encode a package id as a single path segment no longer than `max_length`.
///
/// Reserved characters become `+` and peer suffixes `(a)(b)` become `_a_b`.
/// Names that are too long, or that contain upper-case letters (which would
/// collide on case-insensitive filesystems), are truncated and suffixed with
/// a digest of the full name.
pub fn dep_path_to_filename(dep_path: &str, max_length: usize) -> String {
    let mut filename: String = unescaped(dep_path)
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '+',
            c => c,
        })
        .collect();

    if filename.contains('(') {
        if filename.ends_with(')') {
            filename.pop();
        }
        filename = filename.replace(")(", "_").replace(['(', ')'], "_");
    }

    let mixed_case = filename != filename.to_lowercase() && !filename.starts_with("file+");
    if filename.len() > max_length || mixed_case {
        let mut end = max_length.saturating_sub(HASH_LENGTH + 1).min(filename.len());
        while !filename.is_char_boundary(end) {
            end -= 1;
        }
        return format!("{}_{}", &filename[..end], short_hash(&filename));
    }

    filename
}

fn unescaped(dep_path: &str) -> String {
    match dep_path.strip_prefix("file:") {
        Some(rest) => format!("file+{rest}"),
        None => dep_path.strip_prefix('/').unwrap_or(dep_path).to_string(),
    }
}

fn short_hash(value: &str) -> String {
    let mut hex = hex::encode(Sha256::digest(value.as_bytes()));
    hex.truncate(HASH_LENGTH);
    hex
}
