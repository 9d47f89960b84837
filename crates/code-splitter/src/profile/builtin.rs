use super::LanguageProfile;
use crate::config::ThresholdOverrides;
use crate::language::Language;
use crate::types::ConstructKind;

/// Table-driven language profile
#[derive(Debug, Clone)]
pub struct StaticProfile {
    language: Language,
    constructs: &'static [(&'static str, ConstructKind)],
    trivia: &'static [&'static str],
    wrappers: &'static [&'static str],
    overrides: ThresholdOverrides,
}

impl StaticProfile {
    #[must_use]
    pub const fn new(
        language: Language,
        constructs: &'static [(&'static str, ConstructKind)],
        trivia: &'static [&'static str],
    ) -> Self {
        Self {
            language,
            constructs,
            trivia,
            wrappers: &[],
            overrides: ThresholdOverrides {
                function_min_lines: None,
                function_min_body_chars: None,
                class_min_lines: None,
                namespace_min_lines: None,
                template_min_lines: None,
                import_max_lines: None,
                max_nesting_level: None,
            },
        }
    }

    #[must_use]
    pub const fn with_wrappers(mut self, wrappers: &'static [&'static str]) -> Self {
        self.wrappers = wrappers;
        self
    }

    #[must_use]
    pub const fn with_overrides(mut self, overrides: ThresholdOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

impl LanguageProfile for StaticProfile {
    fn language(&self) -> Language {
        self.language
    }

    fn classify(&self, node_kind: &str) -> Option<ConstructKind> {
        self.constructs
            .iter()
            .find(|(kind, _)| *kind == node_kind)
            .map(|&(_, construct)| construct)
    }

    fn is_leading_trivia(&self, node_kind: &str) -> bool {
        self.trivia.contains(&node_kind)
    }

    fn is_wrapper(&self, node_kind: &str) -> bool {
        self.wrappers.contains(&node_kind)
    }

    fn threshold_overrides(&self) -> ThresholdOverrides {
        self.overrides
    }
}

use ConstructKind::{Class, Function, Import, Namespace, Template};

const RUST: &[(&str, ConstructKind)] = &[
    ("function_item", Function),
    ("struct_item", Class),
    ("enum_item", Class),
    ("union_item", Class),
    ("trait_item", Class),
    ("impl_item", Class),
    ("mod_item", Namespace),
    ("macro_definition", Template),
    ("use_declaration", Import),
    ("extern_crate_declaration", Import),
];

const PYTHON: &[(&str, ConstructKind)] = &[
    ("function_definition", Function),
    ("class_definition", Class),
    ("import_statement", Import),
    ("import_from_statement", Import),
    ("future_import_statement", Import),
];

const JAVASCRIPT: &[(&str, ConstructKind)] = &[
    ("function_declaration", Function),
    ("generator_function_declaration", Function),
    ("method_definition", Function),
    ("class_declaration", Class),
    ("import_statement", Import),
];

const TYPESCRIPT: &[(&str, ConstructKind)] = &[
    ("function_declaration", Function),
    ("generator_function_declaration", Function),
    ("method_definition", Function),
    ("class_declaration", Class),
    ("abstract_class_declaration", Class),
    ("interface_declaration", Class),
    ("enum_declaration", Class),
    ("internal_module", Namespace),
    ("module", Namespace),
    ("import_statement", Import),
];

const GO: &[(&str, ConstructKind)] = &[
    ("function_declaration", Function),
    ("method_declaration", Function),
    ("type_declaration", Class),
    ("import_declaration", Import),
];

const C: &[(&str, ConstructKind)] = &[
    ("function_definition", Function),
    ("struct_specifier", Class),
    ("union_specifier", Class),
    ("enum_specifier", Class),
    ("type_definition", Class),
    ("preproc_include", Import),
];

const CPP: &[(&str, ConstructKind)] = &[
    ("function_definition", Function),
    ("class_specifier", Class),
    ("struct_specifier", Class),
    ("union_specifier", Class),
    ("enum_specifier", Class),
    ("type_definition", Class),
    ("namespace_definition", Namespace),
    ("template_declaration", Template),
    ("preproc_include", Import),
    ("using_declaration", Import),
];

const C_TRIVIA: &[&str] = &["comment"];

pub(super) fn builtin_profiles() -> Vec<StaticProfile> {
    vec![
        StaticProfile::new(
            Language::Rust,
            RUST,
            &["line_comment", "block_comment", "attribute_item"],
        ),
        StaticProfile::new(Language::Python, PYTHON, &["comment", "decorator"])
            .with_wrappers(&["decorated_definition"]),
        StaticProfile::new(Language::JavaScript, JAVASCRIPT, &["comment", "decorator"])
            .with_wrappers(&["export_statement"]),
        StaticProfile::new(Language::TypeScript, TYPESCRIPT, &["comment", "decorator"])
            .with_wrappers(&["export_statement", "ambient_declaration"]),
        // grouped `import ( ... )` blocks routinely run long
        StaticProfile::new(Language::Go, GO, C_TRIVIA).with_overrides(ThresholdOverrides {
            import_max_lines: Some(200),
            ..ThresholdOverrides::default()
        }),
        StaticProfile::new(Language::C, C, C_TRIVIA),
        StaticProfile::new(Language::Cpp, CPP, C_TRIVIA),
    ]
}
