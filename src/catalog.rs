//! Declarative generation tables: match tiers and the role catalog.
//!
//! The tier table is the single source of the label → canonical score mapping.
//! Text synthesis in [`crate::generator`] only interprets the [`Overlap`] rule
//! attached to each tier.

use crate::error::EvalError;
use crate::model::MatchTier;

/// How a tier's source document relates to the target vocabulary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Overlap {
    /// Leading fraction of the target category's skills.
    Fraction(f64),
    /// Leading skills of a different, randomly chosen category.
    ForeignSubset(usize),
    /// Generic text for a non-technical job.
    Unrelated,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierSpec {
    pub tier: MatchTier,
    pub overlap: Overlap,
    pub canonical_score: f64,
}

pub const TIER_TABLE: [TierSpec; 5] = [
    TierSpec {
        tier: MatchTier::High,
        overlap: Overlap::Fraction(1.0),
        canonical_score: 1.0,
    },
    TierSpec {
        tier: MatchTier::MediumHigh,
        overlap: Overlap::Fraction(0.8),
        canonical_score: 0.8,
    },
    TierSpec {
        tier: MatchTier::Medium,
        overlap: Overlap::Fraction(0.5),
        canonical_score: 0.6,
    },
    TierSpec {
        tier: MatchTier::LowMedium,
        overlap: Overlap::ForeignSubset(3),
        canonical_score: 0.4,
    },
    TierSpec {
        tier: MatchTier::Low,
        overlap: Overlap::Unrelated,
        canonical_score: 0.0,
    },
];

pub fn tier_spec(tier: MatchTier) -> &'static TierSpec {
    // TIER_TABLE is ordered like MatchTier::ALL.
    &TIER_TABLE[tier as usize]
}

pub fn canonical_score(tier: MatchTier) -> f64 {
    tier_spec(tier).canonical_score
}

/// Number of skills kept by a fractional tier, never below one.
pub fn subset_len(vocabulary_len: usize, fraction: f64) -> usize {
    let raw = (vocabulary_len as f64 * fraction).floor() as usize;
    raw.max(1).min(vocabulary_len.max(1))
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoleCategory {
    pub role: String,
    pub skills: Vec<String>,
}

impl RoleCategory {
    pub fn new(role: &str, skills: &[&str]) -> Self {
        Self {
            role: role.to_string(),
            skills: skills.iter().map(|skill| (*skill).to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoleCatalog {
    pub categories: Vec<RoleCategory>,
    pub experience_levels: Vec<String>,
    pub unrelated_jobs: Vec<String>,
}

impl RoleCatalog {
    pub fn validate(&self) -> Result<(), EvalError> {
        if self.categories.len() < 2 {
            return Err(EvalError::InvalidCatalog {
                reason: format!(
                    "at least two role categories are required, found {}",
                    self.categories.len()
                ),
            });
        }

        if let Some(empty) = self
            .categories
            .iter()
            .find(|category| category.skills.iter().all(|skill| skill.trim().is_empty()))
        {
            return Err(EvalError::InvalidCatalog {
                reason: format!("role '{}' has an empty skill vocabulary", empty.role),
            });
        }

        if self.experience_levels.is_empty() {
            return Err(EvalError::InvalidCatalog {
                reason: "no experience levels configured".to_string(),
            });
        }

        if self.unrelated_jobs.is_empty() {
            return Err(EvalError::InvalidCatalog {
                reason: "no unrelated jobs configured".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for RoleCatalog {
    fn default() -> Self {
        let categories = vec![
            RoleCategory::new(
                "Machine Learning Engineer",
                &[
                    "Python",
                    "TensorFlow",
                    "PyTorch",
                    "Scikit-Learn",
                    "NLP",
                    "Computer Vision",
                    "AWS SageMaker",
                ],
            ),
            RoleCategory::new(
                "Full Stack Developer",
                &[
                    "JavaScript",
                    "React",
                    "Node.js",
                    "MongoDB",
                    "Express",
                    "HTML/CSS",
                    "TypeScript",
                ],
            ),
            RoleCategory::new(
                "DevOps Engineer",
                &[
                    "Docker",
                    "Kubernetes",
                    "Jenkins",
                    "Terraform",
                    "AWS",
                    "CI/CD",
                    "Linux",
                ],
            ),
            RoleCategory::new(
                "Data Scientist",
                &[
                    "Python",
                    "Pandas",
                    "NumPy",
                    "SQL",
                    "Tableau",
                    "Statistics",
                    "Machine Learning",
                ],
            ),
            RoleCategory::new(
                "Frontend Developer",
                &[
                    "React",
                    "Vue.js",
                    "Angular",
                    "HTML5",
                    "CSS3",
                    "JavaScript",
                    "Responsive Design",
                ],
            ),
            RoleCategory::new(
                "Backend Developer",
                &[
                    "Java",
                    "Spring Boot",
                    "Python",
                    "Django",
                    "Go",
                    "PostgreSQL",
                    "Redis",
                ],
            ),
            RoleCategory::new(
                "Mobile Developer",
                &[
                    "Swift",
                    "iOS",
                    "Kotlin",
                    "Android",
                    "React Native",
                    "Flutter",
                    "Mobile UI",
                ],
            ),
            RoleCategory::new(
                "Security Engineer",
                &[
                    "Network Security",
                    "Penetration Testing",
                    "Cryptography",
                    "Firewall",
                    "SIEM",
                    "OWASP",
                    "Python",
                ],
            ),
            RoleCategory::new(
                "QA Engineer",
                &[
                    "Selenium",
                    "Appium",
                    "JIRA",
                    "Test Automation",
                    "Python",
                    "Java",
                    "Bug Tracking",
                ],
            ),
            RoleCategory::new(
                "Cloud Architect",
                &[
                    "AWS",
                    "Azure",
                    "Google Cloud",
                    "Microservices",
                    "System Design",
                    "Scalability",
                    "Security",
                ],
            ),
        ];

        Self {
            categories,
            experience_levels: ["Junior", "Mid-Level", "Senior"]
                .iter()
                .map(|level| (*level).to_string())
                .collect(),
            unrelated_jobs: ["Chef", "Driver", "Nurse", "Teacher", "Sales Associate"]
                .iter()
                .map(|job| (*job).to_string())
                .collect(),
        }
    }
}
