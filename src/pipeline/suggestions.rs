//! Rule-based shooting advice derived from a composition caption.

use panocrop_core::domain::StyleLabel;
use rand::Rng;
use rand::seq::SliceRandom;

/// Caption concept that triggers a piece of advice.
const RULES: &[(&str, &str)] = &[
    (
        "subject not prominent",
        "Make the subject stand out more by adjusting the focal length or the framing",
    ),
    (
        "unbalanced composition",
        "The composition feels unbalanced; try placing the subject on a golden-ratio point",
    ),
    (
        "excessive negative space",
        "There is too much empty space; consider framing the scene more tightly",
    ),
    (
        "lacking depth",
        "The picture lacks depth; try a different shooting angle or add foreground elements",
    ),
    (
        "cluttered background",
        "The background is cluttered; pick a simpler backdrop or blur it with a wide aperture",
    ),
    (
        "color clash",
        "The colors clash; adjust the white balance or unify the tones when grading",
    ),
];

const NO_ISSUES: &str = "Composition is good; keep the current style";

const POSITIONAL_TIPS: [&str; 4] = [
    "Moving about one meter to the left can give a better background",
    "Shifting slightly to the right can balance the elements in the frame",
    "Lowering the camera a little can strengthen the subject",
    "Raising the shooting angle can reveal more of the surroundings",
];

/// Maps caption concepts to advice and adds one randomly chosen positional tip.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuggestionGenerator;

impl SuggestionGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Suggestions for `caption`, using the thread-local RNG for the positional tip.
    pub fn suggest(&self, caption: &str, styles: &[StyleLabel]) -> Vec<String> {
        self.suggest_with_rng(caption, styles, &mut rand::thread_rng())
    }

    /// Every rule whose concept appears in `caption` contributes its advice, in rule
    /// order; with no match a single "all good" line is used instead. One positional
    /// tip drawn from `rng` is always appended last.
    pub fn suggest_with_rng<R: Rng + ?Sized>(
        &self,
        caption: &str,
        _styles: &[StyleLabel],
        rng: &mut R,
    ) -> Vec<String> {
        let mut suggestions: Vec<String> = RULES
            .iter()
            .filter(|(concept, _)| caption.contains(concept))
            .map(|(_, advice)| advice.to_string())
            .collect();
        if suggestions.is_empty() {
            suggestions.push(NO_ISSUES.to_string());
        }
        if let Some(tip) = POSITIONAL_TIPS.choose(rng) {
            suggestions.push(tip.to_string());
        }
        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_single_rule_plus_tip() {
        let mut rng = StdRng::seed_from_u64(7);
        let out = SuggestionGenerator::new().suggest_with_rng(
            "subject not prominent, good depth",
            &[],
            &mut rng,
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], RULES[0].1);
        assert!(POSITIONAL_TIPS.contains(&out[1].as_str()));
    }

    #[test]
    fn test_rules_fire_in_order() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = SuggestionGenerator::new().suggest_with_rng(
            "color clash, unbalanced composition, cluttered background",
            &[],
            &mut rng,
        );
        assert_eq!(out.len(), 4);
        assert_eq!(out[0], RULES[1].1);
        assert_eq!(out[1], RULES[4].1);
        assert_eq!(out[2], RULES[5].1);
    }

    #[test]
    fn test_balanced_caption_gets_generic_advice() {
        let out = SuggestionGenerator::new().suggest("good composition, balanced composition", &[]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], NO_ISSUES);
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let generator = SuggestionGenerator::new();
        let a = generator.suggest_with_rng("lacking depth", &[], &mut StdRng::seed_from_u64(42));
        let b = generator.suggest_with_rng("lacking depth", &[], &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
