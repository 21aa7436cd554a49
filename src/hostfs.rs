//! File-backed document host.
//!
//! The standalone adapter the binary runs against: the "active document" is a
//! plain file on disk. Run/build state is driven by the settings panel, which
//! lets the panel demonstrate the unsafe-state skip without a real editor.

use crate::host::DocumentHost;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub(crate) struct FileDocumentHost {
    path: Option<PathBuf>,
    running: bool,
    building: bool,
}

impl FileDocumentHost {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            running: false,
            building: false,
        }
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }
}

impl DocumentHost for FileDocumentHost {
    fn active_path(&self) -> Option<PathBuf> {
        self.path.clone()
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn is_building(&self) -> bool {
        self.building
    }

    fn save(&mut self, path: &Path, as_copy: bool) -> Result<bool> {
        let Some(source) = self.path.clone() else {
            return Ok(false);
        };
        if !source.exists() {
            // The document vanished from under us; decline rather than
            // create an empty file at the target.
            return Ok(false);
        }
        if as_copy || path != source {
            std::fs::copy(&source, path)
                .with_context(|| format!("copy {} to {}", source.display(), path.display()))?;
            return Ok(true);
        }
        // In-place save: rewrite through a sibling and rename so the document
        // is never observable half-written.
        let bytes = std::fs::read(&source).with_context(|| format!("read {}", source.display()))?;
        let tmp = source.with_extension("autosave.tmp");
        std::fs::write(&tmp, bytes).with_context(|| format!("write {}", tmp.display()))?;
        std::fs::rename(&tmp, &source)
            .with_context(|| format!("rename into {}", source.display()))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("{name}-{}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn in_place_save_preserves_contents() {
        let path = scratch_file("scene-autosave-inplace", "scene data");
        let mut host = FileDocumentHost::new(Some(path.clone()));
        assert!(host.save(&path, false).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "scene data");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn copy_save_writes_the_sibling_and_keeps_original() {
        let path = scratch_file("scene-autosave-copy", "scene data");
        let target = path.with_file_name("scene-autosave-copy-target");
        let mut host = FileDocumentHost::new(Some(path.clone()));
        assert!(host.save(&target, true).unwrap());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "scene data");
        assert!(path.exists());
        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_file(&target);
    }

    #[test]
    fn missing_document_declines_the_save() {
        let path = std::env::temp_dir().join("scene-autosave-nonexistent-doc");
        let mut host = FileDocumentHost::new(Some(path.clone()));
        assert!(!host.save(&path, false).unwrap());
    }

    #[test]
    fn pathless_host_declines_the_save() {
        let mut host = FileDocumentHost::new(None);
        assert!(host.active_path().is_none());
        assert!(!host.save(Path::new("anywhere"), false).unwrap());
    }
}
