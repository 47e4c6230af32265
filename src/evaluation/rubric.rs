//! Weighted scoring criteria presented to the evaluator.

use serde::Serialize;

/// A named, weighted scoring criterion with a descriptive scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rubric {
    /// Criterion name.
    pub name: String,
    /// Relative weight in `[0, 1]`; informational only.
    pub weight: f64,
    /// What the criterion measures.
    pub description: String,
    /// Human-readable ordinal scale.
    pub scale: String,
}

impl Rubric {
    /// Construct a rubric entry.
    pub fn new(
        name: impl Into<String>,
        weight: f64,
        description: impl Into<String>,
        scale: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            weight,
            description: description.into(),
            scale: scale.into(),
        }
    }

    /// Weight expressed as a whole percentage.
    pub fn weight_percent(&self) -> u32 {
        (self.weight * 100.0).round().clamp(0.0, 100.0) as u32
    }
}

/// The two rubric lists used to score a document.
///
/// Weights are surfaced to the evaluator for interpretation; they are not required to sum to one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RubricCatalog {
    /// Criteria applied to the CV itself.
    pub cv: Vec<Rubric>,
    /// Criteria applied to the candidate's project work.
    pub project: Vec<Rubric>,
}

impl Default for RubricCatalog {
    fn default() -> Self {
        Self {
            cv: vec![
                Rubric::new(
                    "Technical Skills Match",
                    0.40,
                    "Alignment with backend, databases, APIs, cloud, AI/LLM.",
                    "1=Irrelevant, 2=Few overlaps, 3=Partial, 4=Strong, 5=Excellent+AI/LLM",
                ),
                Rubric::new(
                    "Experience Level",
                    0.25,
                    "Years of experience and project complexity.",
                    "1=<1yr, 2=1–2yrs, 3=2–3yrs, 4=3–4yrs, 5=5+yrs",
                ),
                Rubric::new(
                    "Relevant Achievements",
                    0.20,
                    "Impact of past work.",
                    "1=None, 5=Major measurable impact",
                ),
                Rubric::new(
                    "Cultural/Collaboration Fit",
                    0.15,
                    "Communication, teamwork, learning mindset.",
                    "1=None, 5=Excellent and well-demonstrated",
                ),
            ],
            project: vec![
                Rubric::new(
                    "Correctness",
                    0.30,
                    "Prompt chaining, RAG context injection.",
                    "1=None, 5=Fully correct + thoughtful",
                ),
                Rubric::new(
                    "Code Quality & Structure",
                    0.25,
                    "Clean, modular, tested.",
                    "1=Poor, 5=Excellent+strong tests",
                ),
                Rubric::new(
                    "Resilience & Error Handling",
                    0.20,
                    "API failures, retries, robustness.",
                    "1=None, 5=Production-ready",
                ),
                Rubric::new(
                    "Documentation & Explanation",
                    0.15,
                    "README clarity, setup, trade-offs.",
                    "1=Missing, 5=Excellent",
                ),
                Rubric::new(
                    "Creativity / Bonus",
                    0.10,
                    "Extra features beyond requirements.",
                    "1=None, 5=Outstanding creativity",
                ),
            ],
        }
    }
}
