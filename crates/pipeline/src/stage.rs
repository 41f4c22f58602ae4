//! Pipeline stages and their legal transitions

use std::fmt;

/// Where a single pipeline invocation currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Preprocessing,
    Classifying,
    FallbackClassifying,
    Resolving,
    Done,
}

impl Stage {
    /// Whether `next` may follow `self`
    pub fn can_advance_to(self, next: Stage) -> bool {
        matches!(
            (self, next),
            (Stage::Idle, Stage::Preprocessing)
                | (Stage::Idle, Stage::FallbackClassifying)
                | (Stage::Preprocessing, Stage::Classifying)
                | (Stage::Classifying, Stage::Resolving)
                | (Stage::FallbackClassifying, Stage::Resolving)
                | (Stage::Resolving, Stage::Done)
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Preprocessing => "preprocessing",
            Stage::Classifying => "classifying",
            Stage::FallbackClassifying => "fallback_classifying",
            Stage::Resolving => "resolving",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Stage; 6] = [
        Stage::Idle,
        Stage::Preprocessing,
        Stage::Classifying,
        Stage::FallbackClassifying,
        Stage::Resolving,
        Stage::Done,
    ];

    #[test]
    fn test_model_path() {
        assert!(Stage::Idle.can_advance_to(Stage::Preprocessing));
        assert!(Stage::Preprocessing.can_advance_to(Stage::Classifying));
        assert!(Stage::Classifying.can_advance_to(Stage::Resolving));
        assert!(Stage::Resolving.can_advance_to(Stage::Done));
    }

    #[test]
    fn test_fallback_fork_only_from_idle() {
        assert!(Stage::Idle.can_advance_to(Stage::FallbackClassifying));
        assert!(!Stage::Preprocessing.can_advance_to(Stage::FallbackClassifying));
        assert!(!Stage::Classifying.can_advance_to(Stage::FallbackClassifying));
    }

    #[test]
    fn test_done_is_terminal_and_no_skips() {
        for stage in ALL {
            assert!(!Stage::Done.can_advance_to(stage));
        }
        assert!(!Stage::Idle.can_advance_to(Stage::Resolving));
        assert!(!Stage::Preprocessing.can_advance_to(Stage::Resolving));
    }
}
