//! Pipeline kinds and their default phase catalogs.

use serde::{Deserialize, Serialize};

/// Which process a timeline describes. Selects the default phase catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    #[default]
    Culture,
    Curing,
    Separation,
    Extraction,
    Recipe,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 5] = [
        PipelineKind::Culture,
        PipelineKind::Curing,
        PipelineKind::Separation,
        PipelineKind::Extraction,
        PipelineKind::Recipe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineKind::Culture => "culture",
            PipelineKind::Curing => "curing",
            PipelineKind::Separation => "separation",
            PipelineKind::Extraction => "extraction",
            PipelineKind::Recipe => "recipe",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str().eq_ignore_ascii_case(s))
    }

    /// Built-in phases used when a config carries no custom phase list.
    pub fn default_phases(&self) -> &'static [DefaultPhase] {
        match self {
            PipelineKind::Culture => CULTURE_PHASES,
            PipelineKind::Curing => CURING_PHASES,
            PipelineKind::Separation => SEPARATION_PHASES,
            PipelineKind::Extraction => EXTRACTION_PHASES,
            PipelineKind::Recipe => RECIPE_PHASES,
        }
    }
}

impl std::fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry of a built-in phase catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultPhase {
    pub id: &'static str,
    pub name: &'static str,
    pub duration_days: u32,
}

const fn phase(id: &'static str, name: &'static str, duration_days: u32) -> DefaultPhase {
    DefaultPhase { id, name, duration_days }
}

/// A user-defined phase. A blank name falls back to the catalog entry at the
/// same position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PhaseSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_days: Option<u32>,
}

impl PhaseSpec {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_duration(mut self, days: u32) -> Self {
        self.duration_days = Some(days);
        self
    }
}

pub const CULTURE_PHASES: &[DefaultPhase] = &[
    phase("graine", "Graine (J0)", 1),
    phase("germination", "Germination", 3),
    phase("plantule", "Plantule", 7),
    phase("croissance-debut", "Début croissance", 14),
    phase("croissance-milieu", "Milieu croissance", 14),
    phase("croissance-fin", "Fin croissance", 7),
    phase("stretch-debut", "Début stretch", 7),
    phase("stretch-milieu", "Milieu stretch", 7),
    phase("stretch-fin", "Fin stretch", 7),
    phase("floraison-debut", "Début floraison", 14),
    phase("floraison-milieu", "Milieu floraison", 14),
    phase("floraison-fin", "Fin floraison", 14),
];

pub const CURING_PHASES: &[DefaultPhase] = &[
    phase("sechage", "Séchage", 7),
    phase("curing-debut", "Début curing", 14),
    phase("maturation", "Maturation", 30),
    phase("affinage", "Affinage", 60),
];

pub const SEPARATION_PHASES: &[DefaultPhase] = &[
    phase("preparation", "Préparation matière", 1),
    phase("separation", "Séparation", 1),
    phase("tamisage", "Tamisage", 1),
    phase("sechage", "Séchage", 3),
    phase("pressage", "Pressage", 1),
];

pub const EXTRACTION_PHASES: &[DefaultPhase] = &[
    phase("preparation", "Préparation matière", 1),
    phase("extraction", "Extraction", 1),
    phase("purge", "Purge", 2),
    phase("winterisation", "Winterisation", 1),
    phase("stabilisation", "Stabilisation", 7),
];

pub const RECIPE_PHASES: &[DefaultPhase] = &[
    phase("preparation", "Préparation ingrédients", 1),
    phase("decarboxylation", "Décarboxylation", 1),
    phase("infusion", "Infusion/Mélange", 1),
    phase("cuisson", "Cuisson", 1),
    phase("refroidissement", "Refroidissement", 1),
    phase("conservation", "Conservation", 1),
];
