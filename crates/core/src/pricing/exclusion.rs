use serde::{Deserialize, Serialize};

/// Why a line is kept out of the automatic day-count discount. The same
/// flag also removes the line from the manual discount base when the manual
/// discount applies to discountable lines only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    ExcludedByCategory,
    ExcludedByKeyword,
    ExcludedByFlag,
    NotExcluded,
}

impl ExclusionReason {
    pub fn is_excluded(self) -> bool {
        self != Self::NotExcluded
    }
}

/// Categories that never receive the automatic discount. Free-text field,
/// compared case-insensitively.
const EXCLUDED_CATEGORIES: &[&str] = &["personal", "otros"];

/// Name fragments marking pass-through charges: travel expenses (viáticos),
/// lodging (hospedaje) and freight (flete). Matched accent-folded so
/// `viático` and `viatico` behave the same.
const EXCLUDED_KEYWORDS: &[&str] = &["viatic", "hosped", "flete"];

pub fn classify(category: &str, name: &str, discountable: bool) -> ExclusionReason {
    let category = category.trim().to_lowercase();
    if EXCLUDED_CATEGORIES.contains(&category.as_str()) {
        return ExclusionReason::ExcludedByCategory;
    }

    let name = fold_accents(&name.to_lowercase());
    if EXCLUDED_KEYWORDS.iter().any(|keyword| name.contains(keyword)) {
        return ExclusionReason::ExcludedByKeyword;
    }

    if !discountable {
        return ExclusionReason::ExcludedByFlag;
    }

    ExclusionReason::NotExcluded
}

/// Strips Spanish diacritics so substring checks tolerate accented input.
fn fold_accents(input: &str) -> String {
    input
        .chars()
        .map(|ch| match ch {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}
