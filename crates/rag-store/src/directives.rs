use std::fs;
use std::path::Path;

use rag_core::{PriorityEntry, parse_directives};

use crate::error::Result;

/// Read and parse the directive file. A missing file, or one without a
/// single usable line, means "no directives".
pub fn load_directives(path: &Path, base_dir: &Path) -> Result<Option<Vec<PriorityEntry>>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let entries = parse_directives(&content, base_dir);
    match &entries {
        Some(list) => tracing::debug!("{} directives from {}", list.len(), path.display()),
        None => tracing::debug!("no usable directives in {}", path.display()),
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let got = load_directives(&dir.path().join(".rag_priorities"), dir.path()).unwrap();
        assert!(got.is_none());
    }

    #[test]
    fn test_reads_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".rag_priorities");
        fs::write(&path, "# comment\n0, specs, Specs\nbad line\n").unwrap();
        let got = load_directives(&path, dir.path()).unwrap().unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].relative_path, "specs");
    }
}
