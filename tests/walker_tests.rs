//! Directory walker tests.

use repograph::ingest::path_id;
use repograph::ingest::walk::{walk_repository, WalkOptions};
use repograph::record::{EdgeKind, Node};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x = 1\n").unwrap();
    }

    fn sample_repo() -> TempDir {
        let dir = TempDir::new().expect("Failed to create temp repo");
        touch(dir.path(), "setup.py");
        touch(dir.path(), "pkg/__init__.py");
        touch(dir.path(), "pkg/core/engine.py");
        touch(dir.path(), "pkg/README.md");
        touch(dir.path(), ".git/hooks/hook.py");
        touch(dir.path(), "__pycache__/cached.py");
        touch(dir.path(), "venv/lib/site.py");
        touch(dir.path(), "build_out/gen.py");
        touch(dir.path(), "pkg/.hidden.py");
        dir
    }

    #[test]
    fn test_walk_collects_sources_and_structure() {
        let repo = sample_repo();
        let layout = walk_repository(repo.path(), &WalkOptions::default()).unwrap();

        let rel: Vec<String> = layout
            .files
            .iter()
            .map(|p| p.strip_prefix(repo.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(
            rel,
            vec![
                "build_out/gen.py",
                "pkg/__init__.py",
                "pkg/core/engine.py",
                "setup.py"
            ]
        );

        match &layout.nodes[0] {
            Node::Repository(r) => assert_eq!(r.id, path_id(repo.path())),
            other => panic!("expected Repository first, got {:?}", other.kind()),
        }
        let dirs: Vec<&str> = layout
            .nodes
            .iter()
            .filter_map(|n| match n {
                Node::Directory(d) => Some(d.relpath.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(dirs, vec!["build_out", "pkg", "pkg/core"]);
        assert_eq!(layout.directories, 3);
    }

    #[test]
    fn test_contains_edges_follow_their_source_node() {
        let repo = sample_repo();
        let layout = walk_repository(repo.path(), &WalkOptions::default()).unwrap();
        let ids: Vec<&str> = layout.nodes.iter().map(|n| n.id()).collect();

        assert!(layout.edges.iter().all(|e| e.kind == EdgeKind::Contains));
        for edge in &layout.edges {
            assert!(ids.contains(&edge.from_id.as_str()));
        }
        let file_edges = layout
            .edges
            .iter()
            .filter(|e| e.relationship.as_deref() == Some("contains_file"))
            .count();
        assert_eq!(file_edges, layout.files.len());

        let engine = repo.path().join("pkg/core/engine.py");
        let edge = layout
            .edges
            .iter()
            .find(|e| e.to_id.as_deref() == Some(path_id(&engine).as_str()))
            .unwrap();
        assert_eq!(edge.from_id, path_id(&repo.path().join("pkg/core")));
    }

    #[test]
    fn test_extra_excludes() {
        let repo = sample_repo();
        let options =
            WalkOptions::with_excludes(&["core".to_string(), "build_*".to_string()]).unwrap();
        let layout = walk_repository(repo.path(), &options).unwrap();
        assert_eq!(layout.files.len(), 2);
        assert_eq!(layout.directories, 1);
    }

    #[test]
    fn test_missing_root_is_config_error() {
        let repo = TempDir::new().unwrap();
        let err = walk_repository(&repo.path().join("absent"), &WalkOptions::default()).unwrap_err();
        assert_eq!(err.kind(), "Config");
    }
}
