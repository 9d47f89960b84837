//! Construct registry.
//!
//! Each supported language registers one [`LanguageProfile`] describing which syntax node
//! kinds are chunkable constructs, which ones are leading trivia (doc comments, attributes,
//! decorators) and which ones merely wrap a construct (`export`, decorated definitions).
//! The extractor only talks to the [`ConstructClassifier`] trait, so callers can plug in
//! their own tables or a closure.

mod builtin;

pub use builtin::StaticProfile;

use crate::config::ThresholdOverrides;
use crate::language::Language;
use crate::types::ConstructKind;
use std::collections::HashMap;

/// Per-language construct policy
pub trait LanguageProfile: Send + Sync {
    fn language(&self) -> Language;

    /// Construct kind for a syntax node kind, if it is chunkable
    fn classify(&self, node_kind: &str) -> Option<ConstructKind>;

    /// Comments, attributes and decorators attached to the construct that follows them
    fn is_leading_trivia(&self, _node_kind: &str) -> bool {
        false
    }

    /// Nodes that only decorate a single construct (`export_statement`, `decorated_definition`)
    fn is_wrapper(&self, _node_kind: &str) -> bool {
        false
    }

    fn threshold_overrides(&self) -> ThresholdOverrides {
        ThresholdOverrides::default()
    }
}

/// Classification seam consumed by the extractor
pub trait ConstructClassifier {
    fn classify(&self, language: Language, node_kind: &str) -> Option<ConstructKind>;

    fn is_leading_trivia(&self, _language: Language, _node_kind: &str) -> bool {
        false
    }

    fn is_wrapper(&self, _language: Language, _node_kind: &str) -> bool {
        false
    }

    fn threshold_overrides(&self, _language: Language) -> ThresholdOverrides {
        ThresholdOverrides::default()
    }
}

impl<F> ConstructClassifier for F
where
    F: Fn(Language, &str) -> Option<ConstructKind>,
{
    fn classify(&self, language: Language, node_kind: &str) -> Option<ConstructKind> {
        self(language, node_kind)
    }
}

/// Language profiles keyed by language
#[derive(Default)]
pub struct ConstructRegistry {
    profiles: HashMap<Language, Box<dyn LanguageProfile>>,
}

impl ConstructRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in profiles for every AST language
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for profile in builtin::builtin_profiles() {
            registry.register(Box::new(profile));
        }
        registry
    }

    /// Register a profile, returning the one it replaces
    pub fn register(
        &mut self,
        profile: Box<dyn LanguageProfile>,
    ) -> Option<Box<dyn LanguageProfile>> {
        self.profiles.insert(profile.language(), profile)
    }

    #[must_use]
    pub fn profile(&self, language: Language) -> Option<&dyn LanguageProfile> {
        self.profiles.get(&language).map(|profile| &**profile)
    }

    #[must_use]
    pub fn supports(&self, language: Language) -> bool {
        self.profiles.contains_key(&language)
    }

    /// Registered languages, sorted by name
    #[must_use]
    pub fn languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self.profiles.keys().copied().collect();
        languages.sort_by_key(|language| language.as_str());
        languages
    }
}

impl std::fmt::Debug for ConstructRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstructRegistry")
            .field("languages", &self.languages())
            .finish()
    }
}

impl ConstructClassifier for ConstructRegistry {
    fn classify(&self, language: Language, node_kind: &str) -> Option<ConstructKind> {
        self.profile(language)?.classify(node_kind)
    }

    fn is_leading_trivia(&self, language: Language, node_kind: &str) -> bool {
        self.profile(language)
            .is_some_and(|profile| profile.is_leading_trivia(node_kind))
    }

    fn is_wrapper(&self, language: Language, node_kind: &str) -> bool {
        self.profile(language)
            .is_some_and(|profile| profile.is_wrapper(node_kind))
    }

    fn threshold_overrides(&self, language: Language) -> ThresholdOverrides {
        self.profile(language)
            .map(|profile| profile.threshold_overrides())
            .unwrap_or_default()
    }
}
