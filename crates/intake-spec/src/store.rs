use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::questionnaire::Questionnaire;

const FILE_SUFFIX: &str = ".questionnaire.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("questionnaire '{0}' not found")]
    NotFound(String),
    #[error("invalid questionnaire id '{0}'")]
    InvalidId(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Destination for authored questionnaires.
pub trait FormRepository {
    fn save(&mut self, questionnaire: Questionnaire) -> Result<(), StoreError>;

    fn load(&self, id: &str) -> Result<Questionnaire, StoreError>;

    fn list(&self) -> Result<Vec<String>, StoreError>;
}

fn checked_id(questionnaire: &Questionnaire) -> Result<String, StoreError> {
    let id = questionnaire.id.clone().unwrap_or_default();
    ensure_valid_id(&id)?;
    Ok(id)
}

fn ensure_valid_id(id: &str) -> Result<(), StoreError> {
    let invalid = id.trim().is_empty()
        || id.contains(['/', '\\'])
        || id == "."
        || id == "..";
    if invalid {
        Err(StoreError::InvalidId(id.to_string()))
    } else {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryRepository {
    entries: BTreeMap<String, Questionnaire>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FormRepository for MemoryRepository {
    fn save(&mut self, questionnaire: Questionnaire) -> Result<(), StoreError> {
        let id = checked_id(&questionnaire)?;
        self.entries.insert(id, questionnaire);
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Questionnaire, StoreError> {
        self.entries
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// Stores each questionnaire as `<root>/<id>.questionnaire.json`.
#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    root: PathBuf,
}

impl DirectoryRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}{FILE_SUFFIX}"))
    }
}

impl FormRepository for DirectoryRepository {
    fn save(&mut self, questionnaire: Questionnaire) -> Result<(), StoreError> {
        let id = checked_id(&questionnaire)?;
        fs::create_dir_all(&self.root)?;
        let path = self.path_for(&id);
        fs::write(&path, serde_json::to_string_pretty(&questionnaire)?)?;
        tracing::debug!(path = %path.display(), "questionnaire saved");
        Ok(())
    }

    fn load(&self, id: &str) -> Result<Questionnaire, StoreError> {
        ensure_valid_id(id)?;
        let path = self.path_for(id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(id.to_string()));
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_str(&contents)?)
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let name = entry?.file_name();
            if let Some(id) = name.to_str().and_then(|name| name.strip_suffix(FILE_SUFFIX)) {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questionnaire::to_questionnaire;
    use crate::spec::form::FormSpec;
    use crate::spec::question::{QuestionSpec, QuestionType};
    use tempfile::TempDir;

    fn sample(id: &str) -> Questionnaire {
        to_questionnaire(&FormSpec::new(
            id,
            "Sample",
            vec![QuestionSpec::new("q1", QuestionType::Text, "Q1").required()],
        ))
    }

    fn exercise(repository: &mut dyn FormRepository) {
        repository.save(sample("intake")).expect("save");
        repository.save(sample("followup")).expect("save");
        assert_eq!(repository.load("intake").expect("load"), sample("intake"));
        assert_eq!(
            repository.list().expect("list"),
            vec!["followup".to_string(), "intake".to_string()]
        );
        assert!(matches!(
            repository.load("missing"),
            Err(StoreError::NotFound(id)) if id == "missing"
        ));
        assert!(matches!(
            repository.save(sample("../escape")),
            Err(StoreError::InvalidId(_))
        ));
    }

    #[test]
    fn memory_repository_round_trips() {
        exercise(&mut MemoryRepository::new());
    }

    #[test]
    fn directory_repository_round_trips() {
        let dir = TempDir::new().expect("temp dir");
        let mut repository = DirectoryRepository::new(dir.path().join("forms"));
        assert!(repository.list().expect("list").is_empty());
        exercise(&mut repository);
        assert!(repository.path_for("intake").exists());
    }
}
