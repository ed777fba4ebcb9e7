//! Utility functions and helpers

use std::env;
use std::path::PathBuf;

/// Join path components with dots
pub fn dotted<S: AsRef<str>>(components: &[S]) -> String {
    components
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(".")
}

/// Expand a leading `~` to the user's home directory
pub fn expand_home(path: &str) -> PathBuf {
    let home = env::var_os("HOME").or_else(|| env::var_os("USERPROFILE"));
    match (path.strip_prefix('~'), home) {
        (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with(['/', '\\']) => {
            let mut expanded = PathBuf::from(home);
            let rest = rest.trim_start_matches(['/', '\\']);
            if !rest.is_empty() {
                expanded.push(rest);
            }
            expanded
        }
        _ => PathBuf::from(path),
    }
}

/// Shorten text for use in provenance strings
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars + 2 {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head} ...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dotted() {
        assert_eq!(dotted(&["a", "b", "c"]), "a.b.c");
        assert_eq!(dotted::<&str>(&[]), "");
    }

    #[test]
    fn test_expand_home() {
        temp_env::with_var("HOME", Some("/home/tester"), || {
            assert_eq!(expand_home("~"), PathBuf::from("/home/tester"));
            assert_eq!(expand_home("~/data"), PathBuf::from("/home/tester/data"));
            assert_eq!(expand_home("/tmp/~x"), PathBuf::from("/tmp/~x"));
            assert_eq!(expand_home("~other/x"), PathBuf::from("~other/x"));
        });
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short", 30), "short");
        let long = "x".repeat(40);
        assert_eq!(preview(&long, 30), format!("{} ...", "x".repeat(30)));
    }
}
