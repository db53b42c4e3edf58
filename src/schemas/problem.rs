use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Problem, TestCase};
use crate::db::types::{ScoringPolicy, Visibility};
use crate::services::scoring;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TestCaseCreate {
    #[serde(default = "default_visibility")]
    pub(crate) visibility: Visibility,
    #[serde(default)]
    pub(crate) input: String,
    pub(crate) expected_output: String,
    /// Only meaningful for private cases under custom scoring.
    #[serde(default)]
    #[validate(range(min = 0, max = 1_000_000, message = "score must be 0-1000000"))]
    pub(crate) score: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ProblemCreate {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default = "default_true")]
    pub(crate) is_open: bool,
    /// Ignored for custom scoring, where the total is the sum of private case scores.
    #[serde(default)]
    #[validate(range(min = 0, max = 1_000_000, message = "total_score must be 0-1000000"))]
    pub(crate) total_score: Option<i32>,
    #[serde(default = "default_scoring_policy")]
    pub(crate) scoring_policy: ScoringPolicy,
    #[validate(length(min = 1, message = "at least one language is required"))]
    pub(crate) allowed_languages: Vec<String>,
    #[serde(default)]
    #[validate(nested)]
    pub(crate) test_cases: Vec<TestCaseCreate>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ProblemUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default)]
    pub(crate) is_open: Option<bool>,
    #[serde(default)]
    #[validate(range(min = 0, max = 1_000_000, message = "total_score must be 0-1000000"))]
    pub(crate) total_score: Option<i32>,
    #[serde(default)]
    pub(crate) allowed_languages: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TestCaseResponse {
    pub(crate) id: i64,
    pub(crate) visibility: Visibility,
    pub(crate) input: String,
    pub(crate) expected_output: String,
    /// Points the case is worth under the problem's scoring policy.
    pub(crate) score: i32,
    pub(crate) order_index: i32,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProblemSummaryResponse {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) is_open: bool,
    pub(crate) total_score: i32,
    pub(crate) scoring_policy: ScoringPolicy,
    pub(crate) allowed_languages: Vec<String>,
    pub(crate) created_by: String,
    pub(crate) created_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProblemResponse {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) created_by: String,
    pub(crate) is_open: bool,
    pub(crate) total_score: i32,
    pub(crate) scoring_policy: ScoringPolicy,
    pub(crate) allowed_languages: Vec<String>,
    pub(crate) test_cases: Vec<TestCaseResponse>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl ProblemSummaryResponse {
    pub(crate) fn from_db(problem: Problem) -> Self {
        Self {
            id: problem.id,
            title: problem.title,
            is_open: problem.is_open,
            total_score: problem.total_score,
            scoring_policy: problem.scoring_policy,
            allowed_languages: problem.allowed_languages,
            created_by: problem.created_by,
            created_at: format_primitive(problem.created_at),
        }
    }
}

impl ProblemResponse {
    /// With `include_private` false only public cases are listed.
    pub(crate) fn from_db(problem: Problem, cases: Vec<TestCase>, include_private: bool) -> Self {
        let inputs: Vec<(Visibility, i32)> =
            cases.iter().map(|case| (case.visibility, case.score)).collect();
        let scores = scoring::case_scores(problem.scoring_policy, &inputs, problem.total_score);

        let test_cases = cases
            .into_iter()
            .zip(scores)
            .filter(|(case, _)| include_private || case.visibility == Visibility::Public)
            .map(|(case, score)| TestCaseResponse {
                id: case.id,
                visibility: case.visibility,
                input: case.input,
                expected_output: case.expected_output,
                score,
                order_index: case.order_index,
            })
            .collect();

        Self {
            id: problem.id,
            title: problem.title,
            description: problem.description,
            created_by: problem.created_by,
            is_open: problem.is_open,
            total_score: problem.total_score,
            scoring_policy: problem.scoring_policy,
            allowed_languages: problem.allowed_languages,
            test_cases,
            created_at: format_primitive(problem.created_at),
            updated_at: format_primitive(problem.updated_at),
        }
    }
}

fn default_visibility() -> Visibility {
    Visibility::Private
}

fn default_scoring_policy() -> ScoringPolicy {
    ScoringPolicy::Equal
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::primitive_now_utc;

    fn sample_problem() -> Problem {
        let now = primitive_now_utc();
        Problem {
            id: 1,
            title: "Sum".to_string(),
            description: String::new(),
            created_by: "instructor-1".to_string(),
            is_open: true,
            total_score: 10,
            scoring_policy: ScoringPolicy::Equal,
            allowed_languages: vec!["python".to_string()],
            created_at: now,
            updated_at: now,
        }
    }

    fn sample_case(id: i64, visibility: Visibility) -> TestCase {
        TestCase {
            id,
            problem_id: 1,
            visibility,
            input: "1 2".to_string(),
            expected_output: "3".to_string(),
            score: 0,
            order_index: 0,
            created_at: primitive_now_utc(),
        }
    }

    #[test]
    fn student_view_hides_private_cases() {
        let cases = vec![sample_case(1, Visibility::Public), sample_case(2, Visibility::Private)];

        let view = ProblemResponse::from_db(sample_problem(), cases, false);

        assert_eq!(view.test_cases.len(), 1);
        assert_eq!(view.test_cases[0].id, 1);
        assert_eq!(view.test_cases[0].score, 0);
    }

    #[test]
    fn instructor_view_shows_distributed_scores() {
        let cases = vec![
            sample_case(1, Visibility::Public),
            sample_case(2, Visibility::Private),
            sample_case(3, Visibility::Private),
        ];

        let view = ProblemResponse::from_db(sample_problem(), cases, true);

        let scores: Vec<i32> = view.test_cases.iter().map(|case| case.score).collect();
        assert_eq!(scores, vec![0, 5, 5]);
    }

    #[test]
    fn create_payload_rejects_negative_case_score() {
        let payload: ProblemCreate = serde_json::from_value(serde_json::json!({
            "title": "Sum",
            "allowed_languages": ["python"],
            "scoring_policy": "custom",
            "test_cases": [{"expected_output": "3", "score": -1}]
        }))
        .unwrap();

        assert!(payload.validate().is_err());
        assert_eq!(payload.test_cases[0].visibility, Visibility::Private);
    }

    #[test]
    fn create_payload_caps_scores() {
        let payload: ProblemCreate = serde_json::from_value(serde_json::json!({
            "title": "Sum",
            "allowed_languages": ["python"],
            "scoring_policy": "custom",
            "test_cases": [
                {"expected_output": "3", "score": 2_000_000_000},
                {"expected_output": "4", "score": 2_000_000_000}
            ]
        }))
        .unwrap();
        assert!(payload.validate().is_err());

        let update: ProblemUpdate =
            serde_json::from_value(serde_json::json!({"total_score": 1_000_001})).unwrap();
        assert!(update.validate().is_err());
    }
}
