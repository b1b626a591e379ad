//! Class labels derived from image filenames.
//!
//! Datasets name images after their class followed by a sample number, e.g.
//! `granite12.bmp`, `granite13.bmp`, `marble1.bmp`. The label of an image is
//! its filename with the directory, the extension and every ASCII digit
//! removed:
//!
//! - `BaseDeDados/granite12.bmp` → `"granite"`
//! - `a1.bmp` → `"a"`
//! - `42.bmp` → `""` (empty labels are kept, not rejected)
//!
//! This is plain text surgery, not parsing of a naming convention: digits
//! in the middle of a name are deleted too (`t2x.bmp` → `"tx"`).

use std::path::{Path, is_separator};

/// Extension stripped from filenames when none is configured.
pub const DEFAULT_EXTENSION: &str = ".bmp";

/// Literal text of a glob pattern before its first wildcard character.
///
/// - `"BaseDeDados/*.bmp"` → `"BaseDeDados/"`
/// - `"img?.bmp"` → `"img"`
/// - `"plain.bmp"` → `"plain.bmp"`
pub fn glob_prefix(pattern: &str) -> &str {
    match pattern.find(['*', '?', '[']) {
        Some(pos) => &pattern[..pos],
        None => pattern,
    }
}

/// Derive the label of one path.
///
/// Removes every occurrence of `prefix` and of `extension`, keeps the text
/// after the last path separator, then deletes ASCII digits.
pub fn derive_label(path: &str, prefix: &str, extension: &str) -> String {
    let mut rest = path.to_string();
    if !prefix.is_empty() {
        rest = rest.replace(prefix, "");
    }
    if !extension.is_empty() {
        rest = rest.replace(extension, "");
    }
    let segment = rest
        .rsplit(|c: char| c == '/' || is_separator(c))
        .next()
        .unwrap_or("");
    segment.chars().filter(|c| !c.is_ascii_digit()).collect()
}

/// Labels for a sequence of paths, index-aligned with the input.
pub fn derive_labels<P: AsRef<Path>>(paths: &[P], prefix: &str, extension: &str) -> Vec<String> {
    paths
        .iter()
        .map(|p| derive_label(&p.as_ref().to_string_lossy(), prefix, extension))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn prefix_stops_at_first_wildcard() {
        assert_eq!(glob_prefix("BaseDeDados/*.bmp"), "BaseDeDados/");
        assert_eq!(glob_prefix("../data/img?.bmp"), "../data/img");
        assert_eq!(glob_prefix("set[12]/*.bmp"), "set");
        assert_eq!(glob_prefix("*.bmp"), "");
        assert_eq!(glob_prefix("plain.bmp"), "plain.bmp");
    }

    #[test]
    fn bare_filenames_without_prefix() {
        let labels = derive_labels(&["a1.bmp", "b2.bmp"], "", ".bmp");
        assert_eq!(labels, vec!["a", "b"]);
    }

    #[test]
    fn directories_and_prefix_are_removed() {
        assert_eq!(
            derive_label("BaseDeDados/granite12.bmp", "BaseDeDados/", ".bmp"),
            "granite"
        );
        assert_eq!(
            derive_label("../BaseDeDados/sub/marble007.bmp", "../BaseDeDados/", ".bmp"),
            "marble"
        );
    }

    #[test]
    fn prefix_not_in_path_keeps_last_segment() {
        assert_eq!(derive_label("/data/x/wood3.bmp", "elsewhere/", ".bmp"), "wood");
    }

    #[test]
    fn digits_anywhere_are_deleted() {
        assert_eq!(derive_label("t2x9.bmp", "", ".bmp"), "tx");
        assert_eq!(derive_label("class-10_a.bmp", "", ".bmp"), "class-_a");
    }

    #[test]
    fn all_digit_name_gives_empty_label() {
        assert_eq!(derive_label("dir/42.bmp", "dir/", ".bmp"), "");
    }

    #[test]
    fn every_extension_occurrence_is_removed() {
        assert_eq!(derive_label("a.bmp.bmp", "", ".bmp"), "a");
        // Other extensions are left in place.
        assert_eq!(derive_label("a1.png", "", ".bmp"), "a.png");
    }

    #[test]
    fn only_ascii_digits_are_removed() {
        assert_eq!(derive_label("n٣1.bmp", "", ".bmp"), "n٣");
    }

    #[test]
    fn labels_are_index_aligned_and_digit_free() {
        let paths: Vec<PathBuf> = (0..25)
            .map(|i| PathBuf::from(format!("imgs/c{}lass{}.bmp", i % 3, i)))
            .collect();
        let labels = derive_labels(&paths, "imgs/", ".bmp");

        assert_eq!(labels.len(), paths.len());
        assert!(labels.iter().all(|l| !l.chars().any(|c| c.is_ascii_digit())));
        assert!(labels.iter().all(|l| l == "class"));
    }

    #[test]
    fn derivation_is_deterministic() {
        let paths = ["x/a1.bmp", "x/b22.bmp", "x/c.bmp"];
        assert_eq!(
            derive_labels(&paths, "x/", ".bmp"),
            derive_labels(&paths, "x/", ".bmp")
        );
    }
}
