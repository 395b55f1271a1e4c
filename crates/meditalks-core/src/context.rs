//! Cultural context registry.
//!
//! The five community profiles are static data; [`resolve`] is a lookup
//! over an immutable table and needs no synchronization.

use serde::Serialize;

use crate::error::InputError;
use crate::language::Language;

/// A topic to handle carefully for a community.
///
/// `phrase` is the literal wording to steer away from. `category` is a
/// neutral description of the same area that prompts use instead, so a
/// prompt never introduces the phrase itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SensitiveTopic {
    pub phrase: &'static str,
    pub category: &'static str,
}

/// Adaptation parameters for one target community.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CulturalContext {
    pub id: &'static str,
    pub display_name: &'static str,
    pub region: &'static str,
    pub description: &'static str,
    pub target_language_default: Language,
    pub tone_directives: &'static [&'static str],
    pub sensitive_topics: &'static [SensitiveTopic],
}

static CONTEXTS: [CulturalContext; 5] = [
    CulturalContext {
        id: "tagalog-rural",
        display_name: "Tagalog (Rural Philippines)",
        region: "Philippines",
        description: "Rural Filipino communities with traditional family values",
        target_language_default: Language::Tl,
        tone_directives: &[
            "Use a respectful, family-inclusive tone with the polite markers po and opo",
            "Show respect for elders and involve the family in health decisions",
            "Use familiar local terms and everyday metaphors",
            "Acknowledge traditional healing practices respectfully while keeping the medical advice clear",
        ],
        sensitive_topics: &[
            SensitiveTopic {
                phrase: "contraception",
                category: "reproductive health choices shaped by religious belief",
            },
            SensitiveTopic {
                phrase: "abortion",
                category: "pregnancy outcomes shaped by religious belief",
            },
        ],
    },
    CulturalContext {
        id: "thai-low-literacy",
        display_name: "Thai (Low Literacy)",
        region: "Thailand",
        description: "Thai communities with limited literacy levels",
        target_language_default: Language::Th,
        tone_directives: &[
            "Use very simple words and short sentences suitable for low literacy readers",
            "Prefer visual and metaphorical explanations over technical terms",
            "Keep a respectful, hierarchical tone appropriate to Buddhist customs",
            "Mention traditional medicine only to say it should be discussed with the doctor",
        ],
        sensitive_topics: &[
            SensitiveTopic {
                phrase: "death",
                category: "mortality and end-of-life prognosis",
            },
            SensitiveTopic {
                phrase: "terminal",
                category: "incurable stages of illness",
            },
        ],
    },
    CulturalContext {
        id: "khmer-indigenous",
        display_name: "Khmer (Indigenous Communities)",
        region: "Cambodia",
        description: "Indigenous Khmer communities with traditional practices",
        target_language_default: Language::Km,
        tone_directives: &[
            "Write in a community-centered voice suited to oral retelling",
            "Respect the role of traditional healers and community consensus",
            "Use plain, concrete language with Buddhist-appropriate courtesy",
        ],
        sensitive_topics: &[
            SensitiveTopic {
                phrase: "spirits",
                category: "supernatural explanations of illness",
            },
            SensitiveTopic {
                phrase: "curse",
                category: "beliefs about illness as punishment",
            },
        ],
    },
    CulturalContext {
        id: "vietnamese-elderly",
        display_name: "Vietnamese (Elderly)",
        region: "Vietnam",
        description: "Elderly Vietnamese population with traditional values",
        target_language_default: Language::Vi,
        tone_directives: &[
            "Use a formal, highly respectful register with appropriate honorifics for elders",
            "Address the family as partners in care, reflecting Confucian family hierarchy",
            "Acknowledge traditional medicine while making the prescribed treatment clear",
        ],
        sensitive_topics: &[
            SensitiveTopic {
                phrase: "dementia",
                category: "age-related memory decline",
            },
            SensitiveTopic {
                phrase: "burden",
                category: "feelings about dependence on relatives",
            },
        ],
    },
    CulturalContext {
        id: "malay-traditional",
        display_name: "Malay (Traditional Communities)",
        region: "Malaysia/Indonesia",
        description: "Traditional Malay communities with Islamic influences",
        target_language_default: Language::Ms,
        tone_directives: &[
            "Use a respectful, gender-appropriate and family-inclusive tone",
            "Respect Islamic religious considerations in all health advice",
            "Integrate traditional and modern medicine respectfully",
        ],
        sensitive_topics: &[
            SensitiveTopic {
                phrase: "pork",
                category: "ingredients that are not halal",
            },
            SensitiveTopic {
                phrase: "alcohol",
                category: "substances prohibited by religious law",
            },
        ],
    },
];

/// Look up a context by its identifier.
pub fn resolve(context_id: &str) -> Result<&'static CulturalContext, InputError> {
    CONTEXTS
        .iter()
        .find(|c| c.id == context_id)
        .ok_or_else(|| InputError::UnknownContext(context_id.to_string()))
}

/// All contexts, in display order.
pub fn all() -> &'static [CulturalContext] {
    &CONTEXTS
}
