use std::path::{Path, PathBuf};

const SEPARATORS: &[char] = &['/', '\\'];

/// Strip `base` from the front of `full`, returning what is left with
/// leading separators removed.
///
/// The prefix match ignores ASCII case so drive letters and directory
/// casing may differ between the two inputs. Returns an empty string when
/// either input is blank or `full` is not located under `base`.
pub fn make_relative(base: &str, full: &str) -> String {
    if base.trim().is_empty() || full.trim().is_empty() {
        return String::new();
    }

    let len = base.len();
    if full.len() < len || !full.is_char_boundary(len) || !full[..len].eq_ignore_ascii_case(base) {
        return String::new();
    }

    let rest = &full[len..];
    // "/a/coll2/x" is not under "/a/coll"
    if !base.ends_with(SEPARATORS) && !rest.is_empty() && !rest.starts_with(SEPARATORS) {
        return String::new();
    }

    rest.trim_start_matches(SEPARATORS).to_string()
}

/// Join `relative` onto `base` with platform path semantics.
pub fn make_absolute(base: impl AsRef<Path>, relative: &str) -> PathBuf {
    base.as_ref().join(relative.trim_start_matches(SEPARATORS))
}

/// Rewrite a relative path into the stored document form: forward slashes,
/// no leading separator.
pub fn normalize_relative(relative: &str) -> String {
    relative.replace('\\', "/").trim_start_matches('/').to_string()
}
