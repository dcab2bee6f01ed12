//! The regulatory category table and the semantic-identifier sources the
//! registry is built from.
//!
//! Pattern lists are the fallback path only; keep them short, specific,
//! word-like tokens. Substring matching can and does produce false
//! positives (a word containing "end" matches the end-of-life category) —
//! acceptable because a registered semantic identifier always wins, but
//! every token added here widens that exposure.

/// One output category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Category {
    pub id: &'static str,
    pub label: &'static str,
    /// Ordered substring tokens for the idShort fallback. First category
    /// whose list contains a match wins.
    pub patterns: &'static [&'static str],
}

/// Bucket for elements neither the registry nor the patterns resolve.
pub const UNCATEGORIZED: &str = "uncategorized";

pub const CATEGORIES: &[Category] = &[
    Category {
        id: "identity",
        label: "Identification",
        patterns: &["name", "manufacturer", "serial", "article", "product", "nameplate"],
    },
    Category {
        id: "technical",
        label: "Technical data",
        patterns: &["voltage", "power", "weight", "dimension", "capacity", "temperature"],
    },
    Category {
        id: "materials",
        label: "Materials & substances",
        patterns: &["material", "substance", "composition", "hazard"],
    },
    Category {
        id: "sustainability",
        label: "Sustainability",
        patterns: &["carbon", "footprint", "recycl", "emission", "energy"],
    },
    Category {
        id: "documentation",
        label: "Documentation",
        patterns: &["document", "manual", "certificate", "datasheet", "instruction"],
    },
    Category {
        id: "end-of-life",
        label: "End of life",
        patterns: &["end", "disposal", "dismant", "takeback"],
    },
];

/// Direct template → category assignments. Authoritative: a semantic-id
/// hit here short-circuits the pattern fallback entirely.
pub const TEMPLATE_CATEGORIES: &[(&str, &str)] = &[
    ("https://admin-shell.io/zvei/nameplate/2/0/Nameplate", "identity"),
    ("https://admin-shell.io/zvei/nameplate/2/0/Nameplate/ManufacturerName", "identity"),
    ("https://admin-shell.io/zvei/nameplate/2/0/Nameplate/ManufacturerProductDesignation", "identity"),
    ("https://admin-shell.io/zvei/nameplate/2/0/Nameplate/SerialNumber", "identity"),
    ("https://admin-shell.io/ZVEI/TechnicalData/Submodel/1/2", "technical"),
    ("https://admin-shell.io/ZVEI/TechnicalData/GeneralInformation/1/1", "technical"),
    ("https://admin-shell.io/idta/SubmodelTemplate/MaterialComposition/1/0", "materials"),
    ("https://admin-shell.io/idta/CarbonFootprint/CarbonFootprint/0/9", "sustainability"),
    ("https://admin-shell.io/vdi/2770/1/0/Documentation", "documentation"),
    ("https://admin-shell.io/idta/HandoverDocumentation/1/0", "documentation"),
    ("https://admin-shell.io/idta/Recycling/DisassemblyAndRecycling/1/0", "end-of-life"),
];

/// Legacy semantic identifiers that older records still carry; each alias
/// resolves through its target template's category.
pub const LEGACY_ALIASES: &[(&str, &str)] = &[
    (
        "https://admin-shell.io/zvei/nameplate/1/0/Nameplate",
        "https://admin-shell.io/zvei/nameplate/2/0/Nameplate",
    ),
    (
        "http://admin-shell.io/ZVEI/TechnicalData/Submodel/1/1",
        "https://admin-shell.io/ZVEI/TechnicalData/Submodel/1/2",
    ),
    (
        "https://admin-shell.io/vdi/2770/1/0/DocumentationSubmodel",
        "https://admin-shell.io/vdi/2770/1/0/Documentation",
    ),
];

pub fn category_by_id(id: &str) -> Option<&'static Category> {
    CATEGORIES.iter().find(|c| c.id == id)
}
