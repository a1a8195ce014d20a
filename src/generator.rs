use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::catalog::{Overlap, RoleCatalog, RoleCategory, TIER_TABLE, TierSpec, subset_len};
use crate::error::EvalError;
use crate::model::{DocumentPair, MatchTier};

pub const DEFAULT_VARIANTS_PER_TIER: usize = 2;

#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub seed: Option<u64>,
    pub variants_per_tier: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: None,
            variants_per_tier: DEFAULT_VARIANTS_PER_TIER,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeneratedDataset {
    /// Effective seed, drawn from OS entropy when none was configured.
    pub seed: u64,
    pub variants_per_tier: usize,
    pub category_count: usize,
    pub pairs: Vec<DocumentPair>,
}

pub struct DatasetGenerator {
    catalog: RoleCatalog,
}

impl DatasetGenerator {
    pub fn new(catalog: RoleCatalog) -> Result<Self, EvalError> {
        catalog.validate()?;
        Ok(Self { catalog })
    }

    pub fn catalog(&self) -> &RoleCatalog {
        &self.catalog
    }

    /// Builds `categories × tiers × variants` pairs, stratified evenly.
    pub fn generate(&self, config: &GeneratorConfig) -> Result<GeneratedDataset, EvalError> {
        if config.variants_per_tier == 0 {
            return Err(EvalError::InvalidDataset {
                reason: "variants_per_tier must be at least 1".to_string(),
            });
        }

        let seed = config.seed.unwrap_or_else(entropy_seed);
        let mut rng = StdRng::seed_from_u64(seed);
        let expected = self.catalog.categories.len() * TIER_TABLE.len() * config.variants_per_tier;
        let mut pairs = Vec::with_capacity(expected);
        let mut next_id = 1_u64;

        for (category_index, category) in self.catalog.categories.iter().enumerate() {
            let level = self.pick(&self.catalog.experience_levels, &mut rng)?;
            let target_text = target_document(category, level);

            for spec in &TIER_TABLE {
                for variant in 0..config.variants_per_tier {
                    let source = self.source_document(
                        category_index,
                        category,
                        level,
                        spec,
                        variant,
                        &mut rng,
                    )?;

                    let mut metadata = BTreeMap::new();
                    metadata.insert("role".to_string(), category.role.clone());
                    metadata.insert("level".to_string(), level.to_string());
                    metadata.insert("variant".to_string(), variant.to_string());
                    if let Some(source_role) = source.source_role {
                        metadata.insert("source_role".to_string(), source_role);
                    }

                    pairs.push(DocumentPair {
                        id: next_id,
                        source_text: source.text,
                        target_text: target_text.clone(),
                        ground_truth_label: spec.tier,
                        ground_truth_score: spec.canonical_score,
                        metadata,
                    });
                    next_id += 1;
                }
            }

            debug!(role = %category.role, level = %level, "generated category pairs");
        }

        Ok(GeneratedDataset {
            seed,
            variants_per_tier: config.variants_per_tier,
            category_count: self.catalog.categories.len(),
            pairs,
        })
    }

    fn source_document(
        &self,
        category_index: usize,
        category: &RoleCategory,
        level: &str,
        spec: &TierSpec,
        variant: usize,
        rng: &mut StdRng,
    ) -> Result<SourceDocument, EvalError> {
        match spec.overlap {
            Overlap::Fraction(fraction) => {
                let skills = non_blank_skills(category);
                let keep = subset_len(skills.len(), fraction);
                let skills_text = skills[..keep].join(", ");
                Ok(SourceDocument {
                    text: matched_source_text(spec.tier, &category.role, level, &skills_text, variant),
                    source_role: None,
                })
            }
            Overlap::ForeignSubset(count) => {
                let foreign_indices = (0..self.catalog.categories.len())
                    .filter(|index| *index != category_index)
                    .collect::<Vec<usize>>();
                let foreign_index = *self.pick(&foreign_indices, rng)?;
                let foreign = &self.catalog.categories[foreign_index];
                let skills = non_blank_skills(foreign);
                let keep = count.max(1).min(skills.len());
                let skills_text = skills[..keep].join(", ");
                let text = match variant % 2 {
                    0 => format!(
                        "{level} {} with skills in {skills_text}. Interested in learning {} technologies.",
                        foreign.role, category.role
                    ),
                    _ => format!(
                        "{} focused on {skills_text}. Exploring a move into {} work.",
                        foreign.role, category.role
                    ),
                };
                Ok(SourceDocument {
                    text,
                    source_role: Some(foreign.role.clone()),
                })
            }
            Overlap::Unrelated => {
                let job = self.pick(&self.catalog.unrelated_jobs, rng)?;
                let text = match variant % 2 {
                    0 => format!(
                        "Experienced {job}. Skills include time management, communication, and organization. Hard worker."
                    ),
                    _ => format!(
                        "Dedicated {job} with years of customer-facing work. Reliable, punctual, and organized."
                    ),
                };
                Ok(SourceDocument {
                    text,
                    source_role: Some(job.clone()),
                })
            }
        }
    }

    fn pick<'a, T>(&self, values: &'a [T], rng: &mut StdRng) -> Result<&'a T, EvalError> {
        values.choose(rng).ok_or_else(|| EvalError::InvalidCatalog {
            reason: "cannot sample from an empty catalog list".to_string(),
        })
    }
}

struct SourceDocument {
    text: String,
    source_role: Option<String>,
}

pub fn target_document(category: &RoleCategory, level: &str) -> String {
    let skills = non_blank_skills(category).join(", ");
    format!(
        "Hiring {level} {}. Required skills: {skills}. We are looking for a professional with strong background in these technologies to join our team.",
        category.role
    )
}

fn matched_source_text(
    tier: MatchTier,
    role: &str,
    level: &str,
    skills: &str,
    variant: usize,
) -> String {
    match (tier, variant % 2) {
        (MatchTier::High, 0) => format!(
            "{level} {role} with expertise in {skills}. Proven track record of delivering projects using these technologies."
        ),
        (MatchTier::High, _) => format!(
            "{role} ({level}) who has shipped production systems with {skills}. Comfortable owning features end to end."
        ),
        (MatchTier::MediumHigh, 0) => {
            format!("{level} {role} experienced in {skills}. Fast learner and team player.")
        }
        (MatchTier::MediumHigh, _) => format!(
            "{role} with hands-on work in {skills}. Eager to deepen the remaining parts of the stack."
        ),
        (_, 0) => format!(
            "Professional with experience in {skills}. Looking to transition into a {role} role."
        ),
        (_, _) => format!(
            "Engineer familiar with {skills}. Interested in growing toward {role} responsibilities."
        ),
    }
}

fn non_blank_skills(category: &RoleCategory) -> Vec<&str> {
    category
        .skills
        .iter()
        .map(|skill| skill.trim())
        .filter(|skill| !skill.is_empty())
        .collect()
}

/// Draws a fresh generator seed for runs that did not configure one.
pub fn entropy_seed() -> u64 {
    rand::rng().random::<u64>()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::catalog::canonical_score;

    fn generate(seed: u64, variants_per_tier: usize) -> GeneratedDataset {
        DatasetGenerator::new(RoleCatalog::default())
            .expect("default catalog")
            .generate(&GeneratorConfig {
                seed: Some(seed),
                variants_per_tier,
            })
            .expect("generation should succeed")
    }

    #[test]
    fn default_generation_produces_one_hundred_pairs() {
        let dataset = generate(42, DEFAULT_VARIANTS_PER_TIER);
        assert_eq!(dataset.pairs.len(), 100);
        assert_eq!(dataset.seed, 42);

        let ids = dataset.pairs.iter().map(|pair| pair.id).collect::<Vec<u64>>();
        assert_eq!(ids, (1..=100).collect::<Vec<u64>>());
    }

    #[test]
    fn tiers_and_categories_are_evenly_stratified() {
        let dataset = generate(7, 3);
        let total = dataset.pairs.len();
        assert_eq!(total, 10 * 5 * 3);

        let mut per_tier = HashMap::<MatchTier, usize>::new();
        let mut per_role = HashMap::<String, usize>::new();
        for pair in &dataset.pairs {
            *per_tier.entry(pair.ground_truth_label).or_default() += 1;
            *per_role
                .entry(pair.tag("role").unwrap_or_default().to_string())
                .or_default() += 1;
        }

        for tier in MatchTier::ALL {
            let fraction = per_tier[&tier] as f64 / total as f64;
            assert!((fraction - 0.2).abs() < 1e-12, "{tier} fraction was {fraction}");
        }
        assert_eq!(per_role.len(), 10);
        assert!(per_role.values().all(|count| *count == 15));
    }

    #[test]
    fn labels_carry_their_canonical_scores() {
        let dataset = generate(11, 2);
        for pair in &dataset.pairs {
            assert_eq!(
                pair.ground_truth_score,
                canonical_score(pair.ground_truth_label)
            );
        }
    }

    #[test]
    fn same_seed_reproduces_the_dataset() {
        let first = generate(1234, 2);
        let second = generate(1234, 2);
        assert_eq!(first.pairs, second.pairs);
    }

    #[test]
    fn overlap_shrinks_with_tier() {
        let dataset = generate(5, 1);
        let pairs_for_role = dataset
            .pairs
            .iter()
            .filter(|pair| pair.tag("role") == Some("DevOps Engineer"))
            .collect::<Vec<&DocumentPair>>();
        assert_eq!(pairs_for_role.len(), 5);

        let skill_hits = |text: &str| {
            ["Docker", "Kubernetes", "Jenkins", "Terraform", "AWS", "CI/CD", "Linux"]
                .iter()
                .filter(|skill| text.contains(*skill))
                .count()
        };

        let high = skill_hits(&pairs_for_role[0].source_text);
        let medium_high = skill_hits(&pairs_for_role[1].source_text);
        let medium = skill_hits(&pairs_for_role[2].source_text);
        let low = skill_hits(&pairs_for_role[4].source_text);
        assert_eq!(high, 7);
        assert_eq!(medium_high, 5);
        assert_eq!(medium, 3);
        assert_eq!(low, 0);
        assert!(pairs_for_role[0].target_text.contains("Required skills: Docker"));
    }

    #[test]
    fn foreign_subset_never_reuses_the_target_role() {
        let dataset = generate(99, 4);
        for pair in dataset
            .pairs
            .iter()
            .filter(|pair| pair.ground_truth_label == MatchTier::LowMedium)
        {
            assert_ne!(pair.tag("source_role"), pair.tag("role"));
        }
    }

    #[test]
    fn single_skill_vocabulary_keeps_one_skill_in_partial_tiers() {
        let mut catalog = RoleCatalog::default();
        catalog.categories[0].skills = vec!["Rust".to_string()];
        let dataset = DatasetGenerator::new(catalog)
            .expect("catalog with one skill is valid")
            .generate(&GeneratorConfig {
                seed: Some(3),
                variants_per_tier: 1,
            })
            .expect("generation");

        let medium = dataset
            .pairs
            .iter()
            .find(|pair| {
                pair.tag("role") == Some("Machine Learning Engineer")
                    && pair.ground_truth_label == MatchTier::Medium
            })
            .expect("medium pair exists");
        assert!(medium.source_text.contains("Rust"));
    }

    #[test]
    fn zero_variants_is_rejected() {
        let generator = DatasetGenerator::new(RoleCatalog::default()).expect("catalog");
        let error = generator
            .generate(&GeneratorConfig {
                seed: Some(1),
                variants_per_tier: 0,
            })
            .expect_err("zero variants must fail");
        assert!(matches!(error, EvalError::InvalidDataset { .. }));
    }
}
