//! Story scripts.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::errors::{Result, StoryflowError};

static HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#+\s*\**\s*(.+?)\s*\**\s*$").expect("heading pattern is valid")
});

/// A story script on disk, identified by its file stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    name: String,
    path: PathBuf,
}

impl Story {
    /// Creates a story handle. The file may or may not exist.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self> {
        let name = name.into();
        validate_story_name(&name)?;
        Ok(Self {
            name,
            path: path.into(),
        })
    }

    /// The story name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the script.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if the script file is present.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads the raw script.
    pub async fn read(&self) -> Result<String> {
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }

    /// Display title: the first markdown heading, or the name when there is none
    /// or the script is missing.
    pub async fn title(&self) -> String {
        match self.read().await {
            Ok(text) => extract_title(&text).unwrap_or_else(|| self.name.clone()),
            Err(_) => self.name.clone(),
        }
    }
}

/// Returns the text of the first markdown heading, without emphasis markers.
#[must_use]
pub fn extract_title(text: &str) -> Option<String> {
    text.lines().find_map(|line| {
        HEADING
            .captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    })
}

/// Story names become file names in several directories, so they must be a
/// single path component. Anything a file stem can hold is accepted,
/// including spaces.
pub fn validate_story_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StoryflowError::invalid_input("story name cannot be empty"));
    }
    if name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(StoryflowError::invalid_input(format!(
            "story name '{name}' must be a plain file stem"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_title_variants() {
        assert_eq!(extract_title("# The Fox\n\nOnce"), Some("The Fox".to_string()));
        assert_eq!(extract_title("intro\n## **小红帽**\n"), Some("小红帽".to_string()));
        assert_eq!(extract_title("no heading here"), None);
    }

    #[test]
    fn test_validate_story_name() {
        assert!(validate_story_name("fox").is_ok());
        assert!(validate_story_name("格林童话-白雪公主").is_ok());
        assert!(validate_story_name("").is_err());
        assert!(validate_story_name("../etc").is_err());
        assert!(validate_story_name("a/b").is_err());
        assert!(validate_story_name("..").is_err());
        assert!(validate_story_name("a\0b").is_err());
        assert!(validate_story_name("wolf ").is_ok());
        assert!(validate_story_name(" the fox, part 2").is_ok());
        assert_eq!(
            validate_story_name("../etc").unwrap_err().error_type(),
            "InvalidInputError"
        );
    }

    #[tokio::test]
    async fn test_title_falls_back_to_name() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Story::new("fox", dir.path().join("fox.md")).unwrap();
        assert_eq!(missing.title().await, "fox");

        let path = dir.path().join("wolf.md");
        std::fs::write(&path, "# **The Big Bad Wolf**\n\nHuff.").unwrap();
        let story = Story::new("wolf", &path).unwrap();
        assert!(story.exists());
        assert_eq!(story.title().await, "The Big Bad Wolf");
    }
}
