//! Artifact coverage table and story listing.

use serde::Serialize;
use std::fmt;
use std::io;

use crate::core::{ArtifactKind, ArtifactStore, Story};

/// Artifact presence for one story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRow {
    /// Story name.
    pub story: String,
    /// Presence per column of [`ArtifactKind::ALL`].
    pub present: [bool; 4],
}

impl StatusRow {
    /// True if every artifact is present.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.present.iter().all(|p| *p)
    }
}

/// Per-story, per-artifact presence table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    rows: Vec<StatusRow>,
}

impl StatusReport {
    /// Builds the table for `stories`.
    #[must_use]
    pub fn for_stories(store: &ArtifactStore, stories: &[String]) -> Self {
        let rows = stories
            .iter()
            .map(|story| StatusRow {
                story: story.clone(),
                present: ArtifactKind::ALL.map(|kind| store.exists(story, kind)),
            })
            .collect();
        Self { rows }
    }

    /// Builds the table for every story in the store.
    pub fn collect(store: &ArtifactStore) -> io::Result<Self> {
        Ok(Self::for_stories(store, &store.discover_stories()?))
    }

    /// The rows.
    #[must_use]
    pub fn rows(&self) -> &[StatusRow] {
        &self.rows
    }

    /// Stories with all four artifacts.
    #[must_use]
    pub fn complete(&self) -> usize {
        self.rows.iter().filter(|r| r.is_complete()).count()
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<30} {:<12} {:<12} {:<12} {:<12}",
            "Story", "Image", "Narration", "Mixed", "Video"
        )?;
        writeln!(f, "{}", "-".repeat(78))?;
        for row in &self.rows {
            let [image, narration, mixed, video] = row.present.map(|p| if p { "yes" } else { "-" });
            writeln!(
                f,
                "{:<30} {image:<12} {narration:<12} {mixed:<12} {video:<12}",
                row.story
            )?;
        }
        Ok(())
    }
}

/// One entry of the story listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryEntry {
    /// Story name.
    pub name: String,
    /// Display title.
    pub title: String,
}

/// Numbered list of the stories in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoryListing {
    entries: Vec<StoryEntry>,
}

impl StoryListing {
    /// Reads every story's title.
    pub async fn collect(store: &ArtifactStore) -> crate::errors::Result<Self> {
        let mut entries = Vec::new();
        for name in store.discover_stories()? {
            let title = match Story::new(&name, store.story_path(&name)) {
                Ok(story) => story.title().await,
                Err(_) => name.clone(),
            };
            entries.push(StoryEntry { name, title });
        }
        Ok(Self { entries })
    }

    /// The entries, sorted by name.
    #[must_use]
    pub fn entries(&self) -> &[StoryEntry] {
        &self.entries
    }

    /// Story names.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }
}

impl fmt::Display for StoryListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Available stories ({}):", self.entries.len())?;
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.title == entry.name {
                writeln!(f, "  {:3}. {}", i + 1, entry.name)?;
            } else {
                writeln!(f, "  {:3}. {} ({})", i + 1, entry.name, entry.title)?;
            }
        }
        Ok(())
    }
}
