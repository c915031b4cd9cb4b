//! Payload path normalization

const FILENAME_FORBIDDEN: &[char] = &[':', '*', '?', '"', '<', '>', '|', ';', '#'];

fn is_allowed_in_directory(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ' ' | '/' | '\\')
}

/// Replace characters that are not portable across filesystems with `_`.
///
/// The directory part keeps only `[A-Za-z0-9_-. /\]`; the file name only loses
/// `: * ? " < > | ; #`. Applying this twice gives the same result as once.
pub fn normalize_path(path: &str) -> String {
    let (directory, file_name) = match path.rfind('/') {
        Some(idx) => (&path[..=idx], &path[idx + 1..]),
        None => ("", path),
    };

    let mut normalized = String::with_capacity(path.len());
    normalized.extend(
        directory
            .chars()
            .map(|c| if is_allowed_in_directory(c) { c } else { '_' }),
    );
    normalized.extend(
        file_name
            .chars()
            .map(|c| if FILENAME_FORBIDDEN.contains(&c) { '_' } else { c }),
    );
    normalized
}

/// True when the relative path tries to leave its root
pub fn escapes_root(path: &str) -> bool {
    path.starts_with('/') || path.split(['/', '\\']).any(|component| component == "..")
}
