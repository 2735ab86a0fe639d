//! Project tree fixtures.

use std::io;
use std::path::{Path, PathBuf};

use crate::config::{LayoutConfig, PipelineConfig};
use crate::core::{ArtifactKind, ArtifactStore};

/// A project laid out on disk under a caller-provided root (normally a
/// temporary directory).
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    root: PathBuf,
    config: PipelineConfig,
}

impl ProjectFixture {
    /// Creates the standard directories under `root`.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        Self::with_config(root, PipelineConfig::new())
    }

    /// Creates the directories described by `config` under `root`.
    pub fn with_config(root: impl Into<PathBuf>, config: PipelineConfig) -> io::Result<Self> {
        let fixture = Self {
            root: root.into(),
            config,
        };
        fixture.store().ensure_dirs()?;
        std::fs::create_dir_all(fixture.store().stories_dir())?;
        Ok(fixture)
    }

    /// The project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The configuration used for the layout.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The layout section of the configuration.
    #[must_use]
    pub fn layout(&self) -> &LayoutConfig {
        &self.config.layout
    }

    /// An artifact store over the fixture.
    #[must_use]
    pub fn store(&self) -> ArtifactStore {
        ArtifactStore::new(&self.root, self.config.layout.clone())
    }

    /// Writes a story script and returns its path.
    pub fn write_story(&self, story: &str, text: &str) -> io::Result<PathBuf> {
        let path = self.store().story_path(story);
        std::fs::write(&path, text)?;
        Ok(path)
    }

    /// Writes a story whose body is `paragraphs` paragraphs of `chars` characters.
    pub fn write_long_story(&self, story: &str, paragraphs: usize, chars: usize) -> io::Result<PathBuf> {
        let body = (0..paragraphs)
            .map(|i| {
                let letter = char::from(b'a' + u8::try_from(i % 26).unwrap_or(0));
                letter.to_string().repeat(chars)
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        self.write_story(story, &format!("# {story}\n\n{body}\n"))
    }

    /// Writes an artifact directly, as if a previous run had produced it.
    pub fn write_artifact(&self, story: &str, kind: ArtifactKind, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.store().locate(story, kind);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Reads an artifact back.
    pub fn read_artifact(&self, story: &str, kind: ArtifactKind) -> io::Result<Vec<u8>> {
        std::fs::read(self.store().locate(story, kind))
    }

    /// Writes the shared background music track.
    pub fn write_music(&self, bytes: &[u8]) -> io::Result<Option<PathBuf>> {
        let Some(relative) = &self.config.layout.background_music else {
            return Ok(None);
        };
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_layout() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = ProjectFixture::new(dir.path()).unwrap();

        fixture.write_story("fox", "# Fox\n\nText").unwrap();
        fixture.write_artifact("fox", ArtifactKind::Image, b"png").unwrap();
        let music = fixture.write_music(b"aac").unwrap().unwrap();

        let store = fixture.store();
        assert_eq!(store.discover_stories().unwrap(), vec!["fox"]);
        assert!(store.exists("fox", ArtifactKind::Image));
        assert_eq!(store.background_music(), Some(music));
    }

    #[test]
    fn test_long_story_length() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = ProjectFixture::new(dir.path()).unwrap();
        let path = fixture.write_long_story("fox", 9, 1000).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert_eq!(text.matches('a').count(), 1000);
        assert!(text.starts_with("# fox\n\n"));
    }
}
