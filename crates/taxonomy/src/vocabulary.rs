//! Class label vocabularies

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::VocabularyError;

/// Label reported for a class index the vocabulary does not cover
pub const UNKNOWN_LABEL: &str = "Unknown";

/// PlantVillage fine-grained taxonomy, in training (alphabetical) order
pub const PLANT_VILLAGE_LABELS: [&str; 38] = [
    "Apple___Apple_scab",
    "Apple___Black_rot",
    "Apple___Cedar_apple_rust",
    "Apple___healthy",
    "Blueberry___healthy",
    "Cherry___Powdery_mildew",
    "Cherry___healthy",
    "Corn___Cercospora_leaf_spot Gray_leaf_spot",
    "Corn___Common_rust",
    "Corn___Northern_Leaf_Blight",
    "Corn___healthy",
    "Grape___Black_rot",
    "Grape___Esca_(Black_Measles)",
    "Grape___Leaf_blight_(Isariopsis_Leaf_Spot)",
    "Grape___healthy",
    "Orange___Haunglongbing_(Citrus_greening)",
    "Peach___Bacterial_spot",
    "Peach___healthy",
    "Pepper,_bell___Bacterial_spot",
    "Pepper,_bell___healthy",
    "Potato___Early_blight",
    "Potato___Late_blight",
    "Potato___healthy",
    "Raspberry___healthy",
    "Soybean___healthy",
    "Squash___Powdery_mildew",
    "Strawberry___Leaf_scorch",
    "Strawberry___healthy",
    "Tomato___Bacterial_spot",
    "Tomato___Early_blight",
    "Tomato___Late_blight",
    "Tomato___Leaf_Mold",
    "Tomato___Septoria_leaf_spot",
    "Tomato___Spider_mites Two-spotted_spider_mite",
    "Tomato___Target_Spot",
    "Tomato___Tomato_Yellow_Leaf_Curl_Virus",
    "Tomato___Tomato_mosaic_virus",
    "Tomato___healthy",
];

/// Coarse four-class taxonomy
pub const COARSE_LABELS: [&str; 4] = ["Healthy", "Wheat Rust", "Potato Blight", "Corn Common Smut"];

/// Which vocabulary a deployment binds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabularyKind {
    /// 38-class PlantVillage labels
    PlantVillage,
    /// 4-class coarse labels
    Coarse,
    /// Labels read from a file, one per line
    File,
}

/// Ordered class labels matching a model's output positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    kind: VocabularyKind,
    labels: Vec<String>,
}

impl Vocabulary {
    /// The 38-class PlantVillage vocabulary
    pub fn plant_village() -> Self {
        Self {
            kind: VocabularyKind::PlantVillage,
            labels: PLANT_VILLAGE_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// The 4-class coarse vocabulary
    pub fn coarse() -> Self {
        Self {
            kind: VocabularyKind::Coarse,
            labels: COARSE_LABELS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Build from arbitrary labels; must be non-empty and unique
    pub fn from_labels<I, S>(labels: I) -> Result<Self, VocabularyError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(VocabularyError::Empty);
        }

        let mut seen = HashSet::with_capacity(labels.len());
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(VocabularyError::Duplicate(label.clone()));
            }
        }

        Ok(Self {
            kind: VocabularyKind::File,
            labels,
        })
    }

    /// Read labels from a text file, one per line; blank lines are skipped
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, VocabularyError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| VocabularyError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let vocabulary = Self::from_labels(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        )?;
        info!(
            "Loaded {} labels from {}",
            vocabulary.len(),
            path.display()
        );
        Ok(vocabulary)
    }

    /// Build the vocabulary selected by `kind`. `labels_path` is only read for `File`.
    pub fn load(kind: VocabularyKind, labels_path: Option<&Path>) -> Result<Self, VocabularyError> {
        match kind {
            VocabularyKind::PlantVillage => Ok(Self::plant_village()),
            VocabularyKind::Coarse => Ok(Self::coarse()),
            VocabularyKind::File => match labels_path {
                Some(path) => Self::from_file(path),
                None => Err(VocabularyError::MissingPath),
            },
        }
    }

    /// Which vocabulary this is
    pub fn kind(&self) -> VocabularyKind {
        self.kind
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether there are no classes
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label at `index`, if covered
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Label at `index`, or [`UNKNOWN_LABEL`] when out of range
    pub fn label(&self, index: usize) -> &str {
        match self.get(index) {
            Some(label) => label,
            None => {
                warn!(
                    "Class index {} outside vocabulary of {} labels",
                    index,
                    self.labels.len()
                );
                UNKNOWN_LABEL
            }
        }
    }

    /// Position of a raw label
    pub fn position(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    /// All labels in class order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_sizes() {
        assert_eq!(Vocabulary::plant_village().len(), 38);
        assert_eq!(Vocabulary::coarse().len(), 4);
    }

    #[test]
    fn test_out_of_range_is_unknown() {
        let vocab = Vocabulary::coarse();
        assert_eq!(vocab.label(3), "Corn Common Smut");
        assert_eq!(vocab.label(4), UNKNOWN_LABEL);
        assert_eq!(vocab.label(usize::MAX), UNKNOWN_LABEL);
    }

    #[test]
    fn test_from_labels_rejects_empty_and_duplicates() {
        assert!(matches!(
            Vocabulary::from_labels(Vec::<String>::new()),
            Err(VocabularyError::Empty)
        ));
        assert!(matches!(
            Vocabulary::from_labels(["a", "b", "a"]),
            Err(VocabularyError::Duplicate(_))
        ));
    }

    #[test]
    fn test_from_file_skips_blank_lines() {
        let path = std::env::temp_dir().join(format!("labels-{}.txt", std::process::id()));
        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "Rice___Blast\n\n  Rice___healthy  \n").unwrap();
        }

        let vocab = Vocabulary::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(vocab.kind(), VocabularyKind::File);
        assert_eq!(vocab.labels(), &["Rice___Blast".to_string(), "Rice___healthy".to_string()]);
    }

    #[test]
    fn test_file_kind_without_path() {
        assert!(matches!(
            Vocabulary::load(VocabularyKind::File, None),
            Err(VocabularyError::MissingPath)
        ));
        assert_eq!(
            Vocabulary::load(VocabularyKind::Coarse, None).unwrap(),
            Vocabulary::coarse()
        );
    }

    #[test]
    fn test_position() {
        let vocab = Vocabulary::plant_village();
        assert_eq!(vocab.position("Apple___Apple_scab"), Some(0));
        assert_eq!(vocab.position("Tomato___healthy"), Some(37));
        assert_eq!(vocab.position("Martian___Rot"), None);
    }
}
