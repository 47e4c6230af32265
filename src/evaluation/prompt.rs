//! Rubric prompt construction and evaluator response parsing.

use super::rubric::{Rubric, RubricCatalog};
use super::types::EvaluationResult;
use crate::documents::DocumentView;
use std::fmt::Write as _;

const OUTPUT_SCHEMA: &str = r#"{
  "cv_scores": { "<cv rubric name>": integer 1-5, ... },
  "project_scores": { "<project rubric name>": integer 1-5, ... },
  "cv_match_rate": float between 0 and 1,
  "cv_feedback": string,
  "project_score": float between 0 and 5,
  "project_feedback": string,
  "overall_summary": string
}"#;

/// Assemble the evaluator prompt for `document`.
///
/// The output is a pure function of its inputs. The file reference is included for context only
/// and is never dereferenced.
pub fn build_prompt(rubrics: &RubricCatalog, document: &DocumentView) -> String {
    let mut prompt = String::new();
    prompt.push_str("You are a senior technical recruiter acting as an impartial evaluator.\n");
    prompt.push_str(
        "Evaluate the candidate document against the rubrics below and return JSON ONLY in this format:\n",
    );
    prompt.push_str(OUTPUT_SCHEMA);
    prompt.push_str("\n\n--- CV RUBRICS ---\n");
    push_rubrics(&mut prompt, &rubrics.cv);
    prompt.push_str("\n--- PROJECT RUBRICS ---\n");
    push_rubrics(&mut prompt, &rubrics.project);
    prompt.push_str(
        "\nReturn only valid JSON, with no markdown or explanations outside the JSON.\n",
    );

    let _ = write!(
        prompt,
        "\nDocument Title: {}\nDocument Summary: {}\nFile Path (reference only): {}\n",
        document.title, document.summary, document.file_path
    );
    prompt
}

fn push_rubrics(prompt: &mut String, rubrics: &[Rubric]) {
    for rubric in rubrics {
        let _ = writeln!(
            prompt,
            "- {} (Weight: {}%): {}\n  Scale: {}",
            rubric.name,
            rubric.weight_percent(),
            rubric.description,
            rubric.scale
        );
    }
}

/// Remove surrounding whitespace and a Markdown code fence from a model response.
pub fn strip_code_fence(raw: &str) -> &str {
    let text = raw.trim();
    let text = text.strip_prefix("```json").unwrap_or(text);
    let text = text.strip_prefix("```").unwrap_or(text);
    let text = text.strip_suffix("```").unwrap_or(text);
    text.trim()
}

/// Parse an evaluator response into an [`EvaluationResult`].
pub fn parse_evaluation(raw: &str) -> Result<EvaluationResult, serde_json::Error> {
    serde_json::from_str(strip_code_fence(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> DocumentView {
        DocumentView {
            id: "doc-1".into(),
            owner_id: "owner-1".into(),
            title: "Backend CV".into(),
            summary: "Senior backend engineer, 5 years Go".into(),
            file_path: "https://store.local/documents/cv.pdf?sig".into(),
            embedding: Vec::new(),
        }
    }

    #[test]
    fn prompt_lists_rubrics_with_percent_weights() {
        let prompt = build_prompt(&RubricCatalog::default(), &document());

        assert!(prompt.contains("- Technical Skills Match (Weight: 40%)"));
        assert!(prompt.contains("- Creativity / Bonus (Weight: 10%)"));
        assert!(prompt.contains("Scale: 1=Poor, 5=Excellent+strong tests"));
        let cv_section = prompt.find("--- CV RUBRICS ---").expect("cv section");
        let project_section = prompt.find("--- PROJECT RUBRICS ---").expect("project section");
        assert!(cv_section < project_section);
    }

    #[test]
    fn prompt_ends_with_document_context() {
        let prompt = build_prompt(&RubricCatalog::default(), &document());
        assert!(prompt.contains("\"cv_scores\""));
        assert!(prompt.contains("\"overall_summary\""));
        assert!(prompt.contains("Document Title: Backend CV\n"));
        assert!(prompt.contains("Document Summary: Senior backend engineer, 5 years Go\n"));
        assert!(prompt.ends_with(
            "File Path (reference only): https://store.local/documents/cv.pdf?sig\n"
        ));
    }

    #[test]
    fn prompt_is_deterministic() {
        let catalog = RubricCatalog::default();
        assert_eq!(
            build_prompt(&catalog, &document()),
            build_prompt(&catalog, &document())
        );
    }

    #[test]
    fn parses_fenced_response() {
        let raw = "```json\n{\"cv_match_rate\":0.8,\"cv_feedback\":\"Strong\",\"project_score\":4.5,\"project_feedback\":\"Solid\",\"overall_summary\":\"Hire\"}\n```";
        let result = parse_evaluation(raw).expect("parse");
        assert_eq!(result.cv_match_rate, 0.8);
        assert_eq!(result.project_score, 4.5);
        assert_eq!(result.overall_summary, "Hire");
    }

    #[test]
    fn parses_bare_fence_and_ignores_score_maps() {
        let raw = "  ```\n{\"cv_scores\":{\"Experience Level\":4},\"cv_match_rate\":0.6,\"cv_feedback\":\"\",\"project_score\":3,\"project_feedback\":\"\",\"overall_summary\":\"ok\"}```  ";
        let result = parse_evaluation(raw).expect("parse");
        assert_eq!(result.cv_match_rate, 0.6);
        assert_eq!(result.project_score, 3.0);
    }

    #[test]
    fn rejects_malformed_text() {
        assert!(parse_evaluation("I think this candidate is great!").is_err());
        assert!(parse_evaluation("```json\n{\"cv_match_rate\": \"high\"}\n```").is_err());
    }
}
