//! Expansion of stored directory values and relative path computation.

use std::env;
use std::path::{Path, PathBuf};

/// Expand a stored `DIR` value into a path.
///
/// A leading `~` is the home directory; `$VAR` and `${VAR}` are replaced by
/// environment variables (unset variables are left as written). Relative
/// results are joined onto `base`.
pub fn expand_path(raw: &str, base: Option<&Path>) -> PathBuf {
    let substituted = substitute_vars(raw);
    let expanded = match substituted.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => match dirs::home_dir() {
            Some(home) => home.join(rest.trim_start_matches('/')),
            None => PathBuf::from(&substituted),
        },
        _ => PathBuf::from(&substituted),
    };
    match base {
        Some(base) if expanded.is_relative() => base.join(expanded),
        _ => expanded,
    }
}

fn substitute_vars(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match env::var(name) {
            Ok(value) if !name.is_empty() => out.push_str(&value),
            _ => out.push_str(&rest[pos..=pos + consumed]),
        }
        rest = &after[consumed..];
    }
    out.push_str(rest);
    out
}

/// Express `path` relative to `base`, using `..` where needed.
///
/// Equal paths give `.`. If no relative form exists, `path` is returned
/// unchanged.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    match pathdiff::diff_paths(path, base) {
        Some(relative) if relative.as_os_str().is_empty() => PathBuf::from("."),
        Some(relative) => relative,
        None => path.to_path_buf(),
    }
}
