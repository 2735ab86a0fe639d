//! Artifact kinds and the filesystem-backed artifact registry.
//!
//! Presence of a non-empty file is the completion signal for a stage; the
//! registry is the only place that knows where those files live.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::LayoutConfig;

/// A persisted stage output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// Thumbnail (`.png`).
    Image,
    /// Synthesized narration (`.mp3`).
    Narration,
    /// Narration mixed with music (`.mp3`).
    MixedAudio,
    /// Final video (`.mp4`).
    Video,
}

impl ArtifactKind {
    /// Column order of the status table.
    pub const ALL: [Self; 4] = [Self::Image, Self::Narration, Self::MixedAudio, Self::Video];

    /// File extension without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Image => "png",
            Self::Narration | Self::MixedAudio => "mp3",
            Self::Video => "mp4",
        }
    }

    /// Column header for the status table.
    #[must_use]
    pub fn header(self) -> &'static str {
        match self {
            Self::Image => "Image",
            Self::Narration => "Narration",
            Self::MixedAudio => "Mixed",
            Self::Video => "Video",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Narration => write!(f, "narration"),
            Self::MixedAudio => write!(f, "mixed audio"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Registry of artifacts keyed by (story, kind), backed by a project directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    layout: LayoutConfig,
}

impl ArtifactStore {
    /// Creates a store rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, layout: LayoutConfig) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    /// The project root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir_for(&self, kind: ArtifactKind) -> PathBuf {
        let dir = match kind {
            ArtifactKind::Image => &self.layout.images_dir,
            ArtifactKind::Narration => &self.layout.narrations_dir,
            ArtifactKind::MixedAudio => &self.layout.mixed_dir,
            ArtifactKind::Video => &self.layout.videos_dir,
        };
        self.root.join(dir)
    }

    /// Where the artifact for `(story, kind)` lives, whether or not it exists.
    #[must_use]
    pub fn locate(&self, story: &str, kind: ArtifactKind) -> PathBuf {
        self.dir_for(kind)
            .join(format!("{story}.{}", kind.extension()))
    }

    /// True if the artifact exists and is non-empty.
    #[must_use]
    pub fn exists(&self, story: &str, kind: ArtifactKind) -> bool {
        is_nonempty_file(&self.locate(story, kind))
    }

    /// Returns the artifact path when it exists.
    #[must_use]
    pub fn find(&self, story: &str, kind: ArtifactKind) -> Option<PathBuf> {
        let path = self.locate(story, kind);
        is_nonempty_file(&path).then_some(path)
    }

    /// Directory holding story scripts.
    #[must_use]
    pub fn stories_dir(&self) -> PathBuf {
        self.root.join(&self.layout.stories_dir)
    }

    /// Path of a story script.
    #[must_use]
    pub fn story_path(&self, story: &str) -> PathBuf {
        self.stories_dir()
            .join(format!("{story}.{}", self.layout.story_extension))
    }

    /// Root of the scratch area.
    #[must_use]
    pub fn temp_dir(&self) -> PathBuf {
        self.root.join(&self.layout.temp_dir)
    }

    /// The configured background track, if one is configured and present.
    #[must_use]
    pub fn background_music(&self) -> Option<PathBuf> {
        self.layout
            .background_music
            .as_ref()
            .map(|p| self.root.join(p))
            .filter(|p| is_nonempty_file(p))
    }

    /// Creates every artifact directory and the scratch root.
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for kind in ArtifactKind::ALL {
            std::fs::create_dir_all(self.dir_for(kind))?;
        }
        std::fs::create_dir_all(self.temp_dir())
    }

    /// Story names found in the stories directory, sorted.
    pub fn discover_stories(&self) -> io::Result<Vec<String>> {
        let dir = self.stories_dir();
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let matches_ext = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == self.layout.story_extension);
            if !matches_ext {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Moves a finished file into its artifact slot.
    ///
    /// Outputs are produced in scratch and published in one rename so an
    /// interrupted transcode never looks like a completed stage.
    pub async fn publish(&self, produced: &Path, story: &str, kind: ArtifactKind) -> io::Result<PathBuf> {
        let target = self.locate(story, kind);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        if !is_nonempty_file(produced) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("refusing to publish empty {kind}: {}", produced.display()),
            ));
        }
        tokio::fs::rename(produced, &target).await?;
        Ok(target)
    }

    /// Removes the scratch root if nothing is left in it.
    pub fn tidy_temp_dir(&self) -> io::Result<bool> {
        let dir = self.temp_dir();
        if !dir.is_dir() {
            return Ok(false);
        }
        if std::fs::read_dir(&dir)?.next().is_some() {
            return Ok(false);
        }
        std::fs::remove_dir(&dir)?;
        Ok(true)
    }
}

fn is_nonempty_file(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn store(root: &Path) -> ArtifactStore {
        ArtifactStore::new(root, LayoutConfig::default())
    }

    #[test]
    fn test_locate_follows_layout() {
        let store = store(Path::new("/project"));
        assert_eq!(
            store.locate("fox", ArtifactKind::Image),
            PathBuf::from("/project/images/fox.png")
        );
        assert_eq!(
            store.locate("fox", ArtifactKind::Narration),
            PathBuf::from("/project/narrations/fox.mp3")
        );
        assert_eq!(
            store.locate("fox", ArtifactKind::MixedAudio),
            PathBuf::from("/project/mixed/fox.mp3")
        );
        assert_eq!(
            store.locate("fox", ArtifactKind::Video),
            PathBuf::from("/project/videos/fox.mp4")
        );
        assert_eq!(store.story_path("fox"), PathBuf::from("/project/stories/fox.md"));
    }

    #[test]
    fn test_exists_requires_nonempty_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store.ensure_dirs().unwrap();

        assert!(!store.exists("fox", ArtifactKind::Narration));

        let path = store.locate("fox", ArtifactKind::Narration);
        std::fs::write(&path, b"").unwrap();
        assert!(!store.exists("fox", ArtifactKind::Narration));
        assert!(store.find("fox", ArtifactKind::Narration).is_none());

        std::fs::write(&path, b"ID3").unwrap();
        assert!(store.exists("fox", ArtifactKind::Narration));
        assert_eq!(store.find("fox", ArtifactKind::Narration), Some(path));
    }

    #[test]
    fn test_discover_stories_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let stories = store.stories_dir();
        std::fs::create_dir_all(&stories).unwrap();
        std::fs::write(stories.join("wolf.md"), "# Wolf").unwrap();
        std::fs::write(stories.join("fox.md"), "# Fox").unwrap();
        std::fs::write(stories.join("notes.txt"), "ignore").unwrap();
        std::fs::create_dir(stories.join("drafts.md")).unwrap();

        assert_eq!(store.discover_stories().unwrap(), vec!["fox", "wolf"]);
    }

    #[test]
    fn test_discover_without_stories_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store(dir.path()).discover_stories().unwrap().is_empty());
    }

    #[test]
    fn test_background_music_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        assert!(store.background_music().is_none());

        let music = dir.path().join("background/background.m4a");
        std::fs::create_dir_all(music.parent().unwrap()).unwrap();
        std::fs::write(&music, b"aac").unwrap();
        assert_eq!(store.background_music(), Some(music));

        let layout = LayoutConfig {
            background_music: None,
            ..LayoutConfig::default()
        };
        assert!(ArtifactStore::new(dir.path(), layout).background_music().is_none());
    }

    #[tokio::test]
    async fn test_publish_moves_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let produced = dir.path().join("out.mp3");
        std::fs::write(&produced, b"audio").unwrap();

        let target = store
            .publish(&produced, "fox", ArtifactKind::MixedAudio)
            .await
            .unwrap();

        assert!(!produced.exists());
        assert_eq!(std::fs::read(&target).unwrap(), b"audio");
        assert!(store.exists("fox", ArtifactKind::MixedAudio));
    }

    #[tokio::test]
    async fn test_publish_rejects_empty_output() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let produced = dir.path().join("out.mp3");
        std::fs::write(&produced, b"").unwrap();

        assert!(store.publish(&produced, "fox", ArtifactKind::Video).await.is_err());
        assert!(!store.exists("fox", ArtifactKind::Video));
    }

    #[test]
    fn test_tidy_temp_dir_only_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store.ensure_dirs().unwrap();

        std::fs::write(store.temp_dir().join("leftover"), b"x").unwrap();
        assert!(!store.tidy_temp_dir().unwrap());
        assert!(store.temp_dir().exists());

        std::fs::remove_file(store.temp_dir().join("leftover")).unwrap();
        assert!(store.tidy_temp_dir().unwrap());
        assert!(!store.temp_dir().exists());
    }
}
