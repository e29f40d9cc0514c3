//! Static reference data for the two questionnaires.
//!
//! Category names are matched literally; everything here is a compatibility layer over
//! display names and can shrink once categories carry an explicit group column.

pub const TIER_CATEGORY_NAMES: &[&str] = &[
    "Personnel & Leadership",
    "Mission Profiles",
    "Individual Operator Equipment",
    "Sniper Equipment & Operations",
    "Breaching Operations",
    "Access & Elevated Tactics",
    "Less-Lethal Capabilities",
    "Noise Flash Diversionary Devices (NFDDs)",
    "Chemical Munitions",
    "K9 Operations & Integration",
    "Explosive Ordnance Disposal (EOD) Support",
    "Mobility/Transportation & Armor Support",
    "Unique Environment & Technical Capabilities",
    "SCBA & HAZMAT Capabilities",
    "Tactical Emergency Medical Support (TEMS)",
    "Negotiations & Crisis Response",
];

pub const GAP_CATEGORY_NAMES: &[&str] = &[
    "Team Structure and Chain of Command",
    "Supervisor-to-Operator Ratio",
    "Span of Control Adjustments for Complex Operations",
    "Training and Evaluation of Leadership",
    "Equipment Procurement and Allocation",
    "Equipment Maintenance and Inspection",
    "Equipment Inventory Management",
    "Standard Operating Guidelines (SOGs)",
];

/// Legacy display names mapped onto their canonical category name.
pub const CATEGORY_SYNONYMS: &[(&str, &str)] = &[
    ("Mission Capabilities & Training", "Mission Profiles"),
    ("Team Composition & Structure", "Personnel & Leadership"),
    ("Sniper Operations", "Sniper Equipment & Operations"),
    ("K9 Operations", "K9 Operations & Integration"),
    ("Tactical Medical Support", "Tactical Emergency Medical Support (TEMS)"),
    ("Crisis Negotiations", "Negotiations & Crisis Response"),
    ("Noise Flash Distraction Devices", "Noise Flash Diversionary Devices (NFDDs)"),
    ("Chain of Command", "Team Structure and Chain of Command"),
];

/// Content keywords used when a category has no structurally linked questions.
/// Keywords are lowercase; matching is case-insensitive substring search.
pub const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Personnel & Leadership",
        &["personnel", "leadership", "commander", "team leader", "staffing"],
    ),
    (
        "Mission Profiles",
        &["mission", "warrant", "barricade", "hostage", "high-risk"],
    ),
    (
        "Individual Operator Equipment",
        &["helmet", "body armor", "ballistic", "rifle", "sidearm", "operator equipment"],
    ),
    (
        "Sniper Equipment & Operations",
        &["sniper", "precision rifle", "observer", "overwatch"],
    ),
    (
        "Breaching Operations",
        &["breach", "entry", "door", "forcible", "mechanical", "explosive"],
    ),
    (
        "Access & Elevated Tactics",
        &["ladder", "elevated", "rappel", "rooftop", "window"],
    ),
    (
        "Less-Lethal Capabilities",
        &["less-lethal", "less lethal", "impact munition", "bean bag", "conducted energy"],
    ),
    (
        "Noise Flash Diversionary Devices (NFDDs)",
        &["nfdd", "flash", "diversionary", "distraction device"],
    ),
    (
        "Chemical Munitions",
        &["chemical", "tear gas", "cs gas", "oc spray", "munition"],
    ),
    ("K9 Operations & Integration", &["k9", "k-9", "canine", "dog"]),
    (
        "Explosive Ordnance Disposal (EOD) Support",
        &["eod", "bomb", "ordnance", "ied"],
    ),
    (
        "Mobility/Transportation & Armor Support",
        &["vehicle", "armored", "transport", "mobility", "bearcat"],
    ),
    (
        "Unique Environment & Technical Capabilities",
        &["maritime", "rural", "aircraft", "railcar", "robot", "drone"],
    ),
    (
        "SCBA & HAZMAT Capabilities",
        &["scba", "hazmat", "respirator", "contaminat"],
    ),
    (
        "Tactical Emergency Medical Support (TEMS)",
        &["tems", "medic", "medical", "tourniquet", "casualty"],
    ),
    (
        "Negotiations & Crisis Response",
        &["negotiat", "crisis", "hostage negotiation", "mental health"],
    ),
];

/// Built-in alternate ids for categories re-seeded under new ids.
/// Extended at startup from `CATEGORY_ALIASES_PATH`.
pub const LEGACY_CATEGORY_IDS: &[(&str, &[&str])] = &[];

pub fn synonym_for(name: &str) -> Option<&'static str> {
    CATEGORY_SYNONYMS
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, canonical)| *canonical)
}

pub fn keywords_for(canonical_name: &str) -> Option<&'static [&'static str]> {
    CATEGORY_KEYWORDS
        .iter()
        .find(|(name, _)| *name == canonical_name)
        .map(|(_, keywords)| *keywords)
}
