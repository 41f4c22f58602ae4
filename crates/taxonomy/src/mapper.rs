//! Raw label to canonical disease mapping

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::vocabulary::{Vocabulary, UNKNOWN_LABEL};

/// Delimiter between crop and disease in dataset labels
pub const CROP_SEPARATOR: &str = "___";

/// A raw label with its normalized, crop-less disease name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalDisease {
    /// Raw label as the model vocabulary spells it
    pub name: String,
    /// Human-readable disease name without the crop prefix
    pub clean_name: String,
    /// Crop prefix, when the label carries one
    pub crop: Option<String>,
}

/// Maps labels of one bound vocabulary to canonical disease names
#[derive(Debug, Clone)]
pub struct LabelMapper {
    vocabulary: Arc<Vocabulary>,
}

impl LabelMapper {
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self { vocabulary }
    }

    /// The vocabulary this mapper is bound to
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Map a class index through the vocabulary; out-of-range indices map to Unknown
    pub fn map_index(&self, index: usize) -> CanonicalDisease {
        self.map(self.vocabulary.label(index))
    }

    /// Map a raw label. Pure: the same input always yields the same output.
    pub fn map(&self, raw_label: &str) -> CanonicalDisease {
        let (crop, descriptor) = match raw_label.rsplit_once(CROP_SEPARATOR) {
            Some((crop, descriptor)) => (Some(clean(crop)), descriptor),
            None => (None, raw_label),
        };

        let mut clean_name = clean(descriptor);
        if clean_name.is_empty() {
            clean_name = UNKNOWN_LABEL.to_string();
        }

        CanonicalDisease {
            name: raw_label.to_string(),
            clean_name,
            crop: crop.filter(|c| !c.is_empty()),
        }
    }

    /// Whether the raw label belongs to the bound vocabulary
    pub fn contains(&self, raw_label: &str) -> bool {
        self.vocabulary.position(raw_label).is_some()
    }
}

fn clean(part: &str) -> String {
    part.replace('_', " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PLANT_VILLAGE_LABELS;
    use proptest::prelude::*;

    fn plant_village() -> LabelMapper {
        LabelMapper::new(Arc::new(Vocabulary::plant_village()))
    }

    #[test]
    fn test_strips_crop_and_underscores() {
        let disease = plant_village().map("Apple___Apple_scab");
        assert_eq!(disease.clean_name, "Apple scab");
        assert_eq!(disease.crop.as_deref(), Some("Apple"));
        assert_eq!(disease.name, "Apple___Apple_scab");
    }

    #[test]
    fn test_punctuated_labels() {
        let mapper = plant_village();
        assert_eq!(
            mapper.map("Grape___Esca_(Black_Measles)").clean_name,
            "Esca (Black Measles)"
        );
        let pepper = mapper.map("Pepper,_bell___Bacterial_spot");
        assert_eq!(pepper.clean_name, "Bacterial spot");
        assert_eq!(pepper.crop.as_deref(), Some("Pepper, bell"));
        assert_eq!(
            mapper.map("Tomato___Spider_mites Two-spotted_spider_mite").clean_name,
            "Spider mites Two-spotted spider mite"
        );
    }

    #[test]
    fn test_healthy_keeps_case() {
        assert_eq!(plant_village().map("Apple___healthy").clean_name, "healthy");
    }

    #[test]
    fn test_coarse_labels_pass_through() {
        let mapper = LabelMapper::new(Arc::new(Vocabulary::coarse()));
        let disease = mapper.map_index(1);
        assert_eq!(disease.clean_name, "Wheat Rust");
        assert_eq!(disease.crop, None);
    }

    #[test]
    fn test_out_of_range_index_maps_to_unknown() {
        let disease = plant_village().map_index(38);
        assert_eq!(disease.name, UNKNOWN_LABEL);
        assert_eq!(disease.clean_name, UNKNOWN_LABEL);
    }

    #[test]
    fn test_empty_descriptor_is_unknown() {
        assert_eq!(plant_village().map("Apple___").clean_name, UNKNOWN_LABEL);
    }

    #[test]
    fn test_every_plant_village_label_has_a_name() {
        let mapper = plant_village();
        for label in PLANT_VILLAGE_LABELS {
            assert!(mapper.contains(label));
            let disease = mapper.map(label);
            assert!(!disease.clean_name.is_empty());
            assert!(!disease.clean_name.contains('_'));
        }
    }

    proptest! {
        #[test]
        fn prop_mapping_is_deterministic(index in 0usize..38) {
            let mapper = plant_village();
            let raw = PLANT_VILLAGE_LABELS[index];
            prop_assert_eq!(mapper.map(raw), mapper.map(raw));
            prop_assert_eq!(mapper.map_index(index), mapper.map(raw));
        }

        #[test]
        fn prop_arbitrary_labels_never_panic(raw in ".{0,64}") {
            let disease = plant_village().map(&raw);
            prop_assert!(!disease.clean_name.is_empty());
            prop_assert_eq!(disease.name, raw);
        }
    }
}
