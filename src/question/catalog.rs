//! Static Question Catalog
//!
//! The bundled catalog ships inside the binary so a brand-new bank can always
//! be seeded. Extra catalog files can be merged in from a data directory.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

use super::definition::{Question, RawCatalogFile};
use crate::subject::Subject;

const BUNDLED_CATALOGS: [(&str, &str); 3] = [
    ("math.toml", include_str!("../../data/catalog/math.toml")),
    ("reading.toml", include_str!("../../data/catalog/reading.toml")),
    ("science.toml", include_str!("../../data/catalog/science.toml")),
];

/// Static questions grouped by subject
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    questions: BTreeMap<Subject, Vec<Question>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog compiled into the crate
    pub fn bundled() -> Self {
        let mut catalog = Self::new();
        for (name, content) in BUNDLED_CATALOGS {
            match catalog.merge_toml_str(content) {
                Ok(count) => info!("Loaded {} bundled questions from {}", count, name),
                Err(e) => warn!("Bundled catalog {} is invalid: {}", name, e),
            }
        }
        catalog
    }

    /// Parse a catalog from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, String> {
        let mut catalog = Self::new();
        catalog.merge_toml_str(content)?;
        Ok(catalog)
    }

    /// Merge questions from TOML text, returning how many were added.
    /// Invalid questions are skipped with a warning; a file that fails to
    /// parse is an error.
    pub fn merge_toml_str(&mut self, content: &str) -> Result<usize, String> {
        let raw: RawCatalogFile =
            toml::from_str(content).map_err(|e| format!("Failed to parse catalog: {}", e))?;

        let mut known: HashSet<String> = self
            .questions
            .values()
            .flatten()
            .map(|q| q.id.clone())
            .collect();

        let mut added = 0;
        for raw_question in &raw.questions {
            match Question::from_raw(raw_question) {
                Ok(question) => {
                    if !known.insert(question.id.clone()) {
                        warn!("Duplicate question ID '{}', skipping", question.id);
                        continue;
                    }
                    self.questions.entry(question.subject).or_default().push(question);
                    added += 1;
                }
                Err(e) => warn!("Skipping catalog question: {}", e),
            }
        }
        Ok(added)
    }

    /// Load every `.toml` file in `dir` into this catalog
    pub fn load_from_directory(&mut self, dir: &Path) -> Result<usize, String> {
        if !dir.exists() {
            warn!("Catalog directory does not exist: {:?}", dir);
            return Ok(0);
        }

        let entries = std::fs::read_dir(dir)
            .map_err(|e| format!("Failed to read directory {:?}: {}", dir, e))?;

        let mut total = 0;
        for entry in entries {
            let entry = entry.map_err(|e| format!("Failed to read entry: {}", e))?;
            let path = entry.path();

            if path.extension().map_or(false, |ext| ext == "toml") {
                let content = std::fs::read_to_string(&path)
                    .map_err(|e| format!("Failed to read {:?}: {}", path, e))?;
                match self.merge_toml_str(&content) {
                    Ok(count) => {
                        info!("Loaded {} catalog questions from {:?}", count, path);
                        total += count;
                    }
                    Err(e) => warn!("Failed to load catalog {:?}: {}", path, e),
                }
            }
        }
        Ok(total)
    }

    /// All static questions for a subject
    pub fn for_subject(&self, subject: Subject) -> &[Question] {
        self.questions.get(&subject).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.questions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::definition::Modality;
    use crate::subject::DifficultyTier;
    use tempfile::TempDir;

    #[test]
    fn test_bundled_catalog_covers_every_subject() {
        let catalog = StaticCatalog::bundled();
        for subject in Subject::ALL {
            let questions = catalog.for_subject(subject);
            for tier in [DifficultyTier::Beginner, DifficultyTier::Easy] {
                let mc = questions
                    .iter()
                    .filter(|q| q.tier == tier && q.modality() == Modality::MultipleChoice)
                    .count();
                assert!(mc >= 5, "{} {} has only {} multiple-choice questions", subject, tier, mc);
            }
            let non_mc = questions
                .iter()
                .filter(|q| q.modality() != Modality::MultipleChoice)
                .count();
            assert!(non_mc >= 2);
        }
    }

    #[test]
    fn test_load_from_directory_skips_bad_files() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("extra.toml"),
            r#"
[[question]]
id = "extra-1"
subject = "science"
tier = "medium"
type = "true_false"
text = "Sound travels faster in water than in air."
answer = true
"#,
        )
        .unwrap();
        std::fs::write(temp_dir.path().join("broken.toml"), "[[question]\nid = ").unwrap();

        let mut catalog = StaticCatalog::new();
        let added = catalog.load_from_directory(temp_dir.path()).unwrap();
        assert_eq!(added, 1);
        assert_eq!(catalog.for_subject(Subject::Science).len(), 1);
        assert!(catalog.for_subject(Subject::Math).is_empty());
    }
}
