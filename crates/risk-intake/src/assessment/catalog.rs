use std::collections::HashMap;
use std::sync::OnceLock;

use serde::Serialize;

use super::code::{QuestionCode, QuestionGroup};

/// One selectable answer of a questionnaire item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub value: u8,
    pub label: &'static str,
}

const SEVERITY: [Choice; 3] = [
    Choice { value: 1, label: "Low" },
    Choice { value: 2, label: "Moderate" },
    Choice { value: 3, label: "High" },
];

const AGREEMENT: [Choice; 3] = [
    Choice { value: 1, label: "Disagree" },
    Choice { value: 2, label: "Neutral" },
    Choice { value: 3, label: "Agree" },
];

const REACH: [Choice; 3] = [
    Choice { value: 1, label: "Local" },
    Choice { value: 2, label: "Regional" },
    Choice { value: 3, label: "National" },
];

// Deterioration items score presence at the top of the scale; 2 is never offered.
const PRESENCE: [Choice; 2] = [
    Choice { value: 1, label: "No" },
    Choice { value: 3, label: "Yes" },
];

/// Fixed answer scales shared across the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChoiceSet {
    Severity,
    Agreement,
    Reach,
    Presence,
}

impl ChoiceSet {
    pub const fn choices(self) -> &'static [Choice] {
        match self {
            ChoiceSet::Severity => &SEVERITY,
            ChoiceSet::Agreement => &AGREEMENT,
            ChoiceSet::Reach => &REACH,
            ChoiceSet::Presence => &PRESENCE,
        }
    }

    /// Reverse lookup of a stored numeric answer to its display label.
    pub fn label_for(self, value: u8) -> Option<&'static str> {
        self.choices()
            .iter()
            .find(|choice| choice.value == value)
            .map(|choice| choice.label)
    }
}

/// Static description of one questionnaire item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionInfo {
    pub code: QuestionCode,
    pub legacy_key: &'static str,
    pub title: &'static str,
    pub prompt: &'static str,
    pub choices: ChoiceSet,
    pub weight: u8,
}

/// Read-only registry of every item of the instrument, in questionnaire order.
#[derive(Debug, Clone)]
pub struct QuestionCatalog {
    questions: Vec<QuestionInfo>,
    index: HashMap<QuestionCode, usize>,
}

impl QuestionCatalog {
    pub fn from_questions(questions: Vec<QuestionInfo>) -> Self {
        let index = questions
            .iter()
            .enumerate()
            .map(|(position, question)| (question.code, position))
            .collect();
        Self { questions, index }
    }

    /// The building risk instrument: 12 hazard, 17 exposure, and 24 vulnerability items.
    pub fn standard() -> &'static QuestionCatalog {
        static CATALOG: OnceLock<QuestionCatalog> = OnceLock::new();
        CATALOG.get_or_init(|| {
            QuestionCatalog::from_questions(
                STANDARD_ITEMS
                    .iter()
                    .map(|item| item.to_info())
                    .collect(),
            )
        })
    }

    pub fn lookup(&self, code: QuestionCode) -> Option<&QuestionInfo> {
        self.index
            .get(&code)
            .and_then(|position| self.questions.get(*position))
    }

    /// Look up a record key in either the canonical or the legacy underscore encoding.
    pub fn lookup_key(&self, raw: &str) -> Option<&QuestionInfo> {
        QuestionCode::parse(raw).and_then(|code| self.lookup(code))
    }

    pub fn questions(&self) -> &[QuestionInfo] {
        &self.questions
    }

    pub fn in_group(
        &self,
        group: QuestionGroup,
    ) -> impl Iterator<Item = &QuestionInfo> + Clone + '_ {
        self.questions
            .iter()
            .filter(move |question| question.code.group() == group)
    }

    pub fn codes(&self) -> impl Iterator<Item = QuestionCode> + '_ {
        self.questions.iter().map(|question| question.code)
    }

    pub fn total_weight(&self, group: QuestionGroup) -> u32 {
        self.in_group(group)
            .map(|question| u32::from(question.weight))
            .sum()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

struct CatalogItem {
    group: QuestionGroup,
    major: u8,
    minor: u8,
    legacy_key: &'static str,
    title: &'static str,
    prompt: &'static str,
    choices: ChoiceSet,
    weight: u8,
}

impl CatalogItem {
    fn to_info(&self) -> QuestionInfo {
        QuestionInfo {
            code: QuestionCode::new(self.group, self.major, self.minor),
            legacy_key: self.legacy_key,
            title: self.title,
            prompt: self.prompt,
            choices: self.choices,
            weight: self.weight,
        }
    }
}

macro_rules! item {
    ($group:ident, $major:literal, $minor:literal, $legacy:literal, $title:literal, $prompt:literal, $choices:ident, $weight:literal) => {
        CatalogItem {
            group: QuestionGroup::$group,
            major: $major,
            minor: $minor,
            legacy_key: $legacy,
            title: $title,
            prompt: $prompt,
            choices: ChoiceSet::$choices,
            weight: $weight,
        }
    };
}

const STANDARD_ITEMS: [CatalogItem; 53] = [
    // A1 seismic
    item!(Hazard, 1, 1, "A1_1_PEIS", "PEIS Intensity",
        "Expected ground-shaking intensity at the site on the PHIVOLCS Earthquake Intensity Scale.",
        Severity, 3),
    item!(Hazard, 1, 2, "A1_2_FAULT_DISTANCE", "Fault Distance",
        "Proximity of the nearest active fault; nearer faults rate higher.",
        Severity, 3),
    item!(Hazard, 1, 3, "A1_3_SEISMIC_SOURCE_TYPE", "Seismic Source Type",
        "Capacity of the governing seismic source to produce large-magnitude events.",
        Severity, 3),
    item!(Hazard, 1, 4, "A1_4_LIQUEFACTION", "Potential Liquefaction",
        "Susceptibility of the foundation soil to liquefaction.",
        Severity, 3),
    // A2 wind
    item!(Hazard, 2, 1, "A2_1_BASIC_WIND_SPEED", "Basic Wind Speed",
        "Design wind speed zone of the site.",
        Severity, 2),
    item!(Hazard, 2, 2, "A2_2_BUILDING_VICINITY", "Building Vicinity",
        "Openness of the surrounding terrain to wind exposure.",
        Severity, 2),
    // A3 flood and terrain
    item!(Hazard, 3, 1, "A3_1_SLOPE", "Slope",
        "Steepness of the terrain the building stands on.",
        Severity, 1),
    item!(Hazard, 3, 2, "A3_2_ELEVATION", "Elevation",
        "Flood exposure implied by the site elevation; low-lying sites rate higher.",
        Severity, 1),
    item!(Hazard, 3, 3, "A3_3_DISTANCE_TO_RIVERS_AND_SEAS", "Distance to Rivers and Seas",
        "Proximity to rivers, shorelines, or other open water.",
        Severity, 3),
    item!(Hazard, 3, 4, "A3_4_SURFACE_RUNOFF", "Surface Run-off",
        "Volume of surface run-off collecting around the site during heavy rain.",
        Severity, 1),
    item!(Hazard, 3, 5, "A3_5_BASE_HEIGHT", "Base Height",
        "Height of the ground floor relative to the surrounding grade; lower bases rate higher.",
        Severity, 1),
    item!(Hazard, 3, 6, "A3_6_DRAINAGE_SYSTEM", "Drainage System",
        "Inadequacy of the drainage system serving the site.",
        Severity, 2),
    // B1 architectural value
    item!(Exposure, 1, 1, "B1_1_AESTHETIC_THEME", "Aesthetic Theme",
        "The building expresses a distinct aesthetic or architectural theme.",
        Agreement, 2),
    item!(Exposure, 1, 2, "B1_2_STYLE_UNIQUE", "Unique Style",
        "Its architectural style is unique within the locality.",
        Agreement, 1),
    item!(Exposure, 1, 3, "B1_3_STYLE_TYPICAL", "Typical Style",
        "Its style is a representative example of a recognised period or movement.",
        Agreement, 1),
    item!(Exposure, 1, 4, "B1_4_CITYSCAPE_INTEGRATION", "Cityscape Integration",
        "The building is integral to the character of the surrounding cityscape.",
        Agreement, 2),
    // B2 historical value
    item!(Exposure, 2, 1, "B2_1_AGE_OF_BUILDING", "Age of Building",
        "Age of the building relative to the local building stock.",
        Severity, 2),
    item!(Exposure, 2, 2, "B2_2_PAST_RELEVANCE", "Past Relevance",
        "Reach of the historical events or persons associated with the building.",
        Reach, 3),
    item!(Exposure, 2, 3, "B2_3_GEO_IMPACT", "Geographic Impact",
        "Geographic extent of the building's influence.",
        Reach, 1),
    item!(Exposure, 2, 4, "B2_4_CULTURAL_HERITAGE_TIE", "Cultural Heritage Tie",
        "The building is tied to a living cultural tradition or heritage practice.",
        Agreement, 2),
    item!(Exposure, 2, 5, "B2_5_MESSAGE_WORTH_PRESERVING", "Message Worth Preserving",
        "The building carries a message or memory worth preserving for future generations.",
        Agreement, 2),
    // B3 social value
    item!(Exposure, 3, 1, "B3_1_NO_INITIATIVES", "No Conservation Initiatives",
        "There are no active conservation initiatives for the building.",
        Agreement, 3),
    item!(Exposure, 3, 2, "B3_2_PROMINENT_SUPPORT", "Prominent Support",
        "Level of the most prominent body supporting its conservation.",
        Reach, 3),
    item!(Exposure, 3, 3, "B3_3_IMPORTANCE_DAILY_LIFE", "Importance in Daily Life",
        "The building is important in the daily life of the community.",
        Agreement, 2),
    item!(Exposure, 3, 4, "B3_4_NO_PROMOTION", "No Promotion",
        "The building is not promoted by tourism or heritage bodies.",
        Agreement, 3),
    // B4 economic value
    item!(Exposure, 4, 1, "B4_1_TOURIST_MUST_SEE", "Tourist Must-See",
        "The building is regarded as a must-see destination for visitors.",
        Agreement, 2),
    item!(Exposure, 4, 2, "B4_2_TOURISM_CONTRIBUTION", "Tourism Contribution",
        "Contribution of the building to local tourism revenue.",
        Severity, 1),
    item!(Exposure, 4, 3, "B4_3_VISITED_FOR_GOODS", "Visited for Goods",
        "People visit the building to buy goods or services offered there.",
        Agreement, 1),
    item!(Exposure, 4, 4, "B4_4_CURRENT_USE_ADOPTS_NEEDS", "Current Use Adapts to Needs",
        "The current use of the building adapts to present community needs.",
        Agreement, 2),
    // C1 structural configuration
    item!(Vulnerability, 1, 1, "C1_1_CODE_YEAR_BUILT", "Code Year Built",
        "Age of the structural code the building was designed to; older codes rate higher.",
        Severity, 3),
    item!(Vulnerability, 1, 2, "C1_2_PLAN_IRREGULARITY", "Plan Irregularity",
        "Degree of irregularity of the floor plan.",
        Severity, 3),
    item!(Vulnerability, 1, 3, "C1_3_VERTICAL_IRREGULARITY", "Vertical Irregularity",
        "Degree of irregularity in elevation, setbacks, or soft storeys.",
        Severity, 2),
    item!(Vulnerability, 1, 4, "C1_4_BUILDING_PROXIMITY", "Building Proximity",
        "Risk of pounding from adjacent structures; closer neighbours rate higher.",
        Severity, 1),
    item!(Vulnerability, 1, 5, "C1_5_NUMBER_OF_STOREYS", "Number of Storeys",
        "Height class of the building.",
        Severity, 2),
    item!(Vulnerability, 1, 6, "C1_6_STRUCT_SYSTEM_MATERIAL", "Structural System Material",
        "Fragility of the primary structural material.",
        Severity, 1),
    item!(Vulnerability, 1, 7, "C1_7_NUMBER_OF_BAYS", "Number of Bays",
        "Lack of redundancy implied by the number of bays.",
        Severity, 3),
    item!(Vulnerability, 1, 8, "C1_8_COLUMN_SPACING", "Column Spacing",
        "Span between columns; wider spacing rates higher.",
        Severity, 1),
    item!(Vulnerability, 1, 9, "C1_9_BUILDING_ENCLOSURE", "Building Enclosure",
        "Openness of the building envelope to wind pressure.",
        Severity, 3),
    item!(Vulnerability, 1, 10, "C1_10_WALL_MATERIAL", "Wall Material",
        "Fragility of the wall material.",
        Severity, 3),
    item!(Vulnerability, 1, 11, "C1_11_FRAMING_TYPE", "Framing Type",
        "Weakness of the framing type against lateral loads.",
        Severity, 3),
    item!(Vulnerability, 1, 12, "C1_12_FLOORING_MATERIAL", "Flooring Material",
        "Fragility of the flooring material.",
        Severity, 1),
    // C2 deterioration
    item!(Vulnerability, 2, 1, "C2_1_CRACK_WIDTH", "Crack Width",
        "Width of the largest visible structural crack.",
        Severity, 2),
    item!(Vulnerability, 2, 2, "C2_2_UNEVEN_SETTLEMENT", "Uneven Settlement",
        "Is there visible uneven settlement of the foundation or floors?",
        Presence, 1),
    item!(Vulnerability, 2, 3, "C2_3_BEAM_COLUMN_DEFORMATION", "Beam/Column Deformation",
        "Are beams or columns visibly deformed?",
        Presence, 3),
    item!(Vulnerability, 2, 4, "C2_4_FINISHING_DETERIORATION", "Finishing Deterioration",
        "Are finishes spalling, peeling, or otherwise deteriorated?",
        Presence, 3),
    item!(Vulnerability, 2, 5, "C2_5_MEMBER_DECAY", "Member Decay",
        "Are structural members rotting, corroding, or otherwise decayed?",
        Presence, 3),
    item!(Vulnerability, 2, 6, "C2_6_ADDITIONAL_LOADS", "Additional Loads",
        "Has the building been loaded beyond its original use (added storeys, tanks, equipment)?",
        Presence, 1),
    item!(Vulnerability, 2, 7, "C2_7_EXPOSED_REINFORCEMENT", "Exposed Reinforcement",
        "Is reinforcing steel exposed or visibly corroded anywhere in the structure?",
        Presence, 2),
    // C3 roof form
    item!(Vulnerability, 3, 1, "C3_1_ROOF_DESIGN", "Roof Design",
        "Wind uplift susceptibility of the roof form.",
        Severity, 3),
    item!(Vulnerability, 3, 2, "C3_2_ROOF_SLOPE", "Roof Slope",
        "Uplift susceptibility implied by the roof pitch.",
        Severity, 3),
    item!(Vulnerability, 3, 3, "C3_3_ROOFING_MATERIAL", "Roofing Material",
        "Fragility of the roof covering.",
        Severity, 2),
    // C4 roof anchorage
    item!(Vulnerability, 4, 1, "C4_1_ROOF_FASTENERS", "Roof Fasteners",
        "Weakness of the roof fastener type.",
        Severity, 2),
    item!(Vulnerability, 4, 2, "C4_2_FASTENER_SPACING", "Fastener Spacing",
        "Distance between roof fasteners; wider spacing rates higher.",
        Severity, 2),
];
