//! Stable identifier tests.

use repograph::identity::{content_hash, stable_id};
use std::collections::HashSet;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_id_is_pure() {
        let parts = ["/repo/a.py", "function", "run", "12"];
        assert_eq!(stable_id(&parts), stable_id(&parts));
        let owned: Vec<String> = parts.iter().map(|p| p.to_string()).collect();
        assert_eq!(stable_id(&owned), stable_id(&parts));
    }

    #[test]
    fn test_no_collisions_across_a_corpus() {
        let mut seen = HashSet::new();
        for file in 0..50 {
            for kind in ["class", "function", "var", "import", "decorator"] {
                for line in 1..40 {
                    let path = format!("/repo/pkg{}/mod.py", file);
                    let id = stable_id(&[path.as_str(), kind, "name", line.to_string().as_str()]);
                    assert!(seen.insert(id), "collision for {} {} {}", path, kind, line);
                }
            }
        }
        assert_eq!(seen.len(), 50 * 5 * 39);
    }

    #[test]
    fn test_part_boundaries_matter() {
        assert_ne!(stable_id(&["ab", "c"]), stable_id(&["a", "bc"]));
        assert_ne!(stable_id(&["a"]), stable_id(&["a", ""]));
    }

    #[test]
    fn test_content_hash_tracks_text() {
        assert_eq!(content_hash("x = 1\n"), content_hash("x = 1\n"));
        assert_ne!(content_hash("x = 1\n"), content_hash("x = 2\n"));
    }
}
