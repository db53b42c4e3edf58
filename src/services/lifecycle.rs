use std::sync::Arc;
use std::time::Instant;

use sha2::{Digest, Sha256};
use sqlx::PgPool;
use thiserror::Error;

use crate::core::config::Settings;
use crate::core::{metrics, time::primitive_now_utc};
use crate::db::models::{Problem, Submission, TestCase, User};
use crate::db::types::{SubmissionStatus, UserRole, Visibility};
use crate::repositories;
use crate::repositories::submissions::{CreateSubmission, GradingResult, SubmissionListRow};
use crate::schemas::submission::CallbackPayload;
use crate::services::executor::{Executor, GradingJob, TestCasePayload};
use crate::services::scoring;

/// Values the lifecycle needs from configuration, passed in at construction.
#[derive(Debug, Clone)]
pub(crate) struct LifecycleConfig {
    /// Absolute URL the executor posts results to.
    pub(crate) callback_url: String,
    /// Shared secret sent with every job and expected back on the callback.
    pub(crate) api_key: String,
    pub(crate) max_code_bytes: usize,
}

impl LifecycleConfig {
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self {
            callback_url: settings.callback_url(),
            api_key: settings.execution().api_key.clone(),
            max_code_bytes: settings.problems().max_code_bytes,
        }
    }
}

/// Identity of whoever is asking; every operation checks it before touching storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Caller {
    pub(crate) user_id: String,
    pub(crate) role: UserRole,
}

impl From<&User> for Caller {
    fn from(user: &User) -> Self {
        Self { user_id: user.id.clone(), role: user.role }
    }
}

#[derive(Debug, Error)]
pub(crate) enum LifecycleError {
    #[error("{0}")]
    Authorization(&'static str),
    #[error("{0}")]
    Authentication(&'static str),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("storage failure: {0}")]
    Persistence(#[from] sqlx::Error),
}

/// Result of reconciling one executor callback.
#[derive(Debug)]
pub(crate) struct CallbackOutcome {
    /// `false` when the submission was already terminal and nothing changed.
    pub(crate) applied: bool,
    pub(crate) best_score_updated: bool,
    pub(crate) submission: Submission,
}

#[derive(Clone)]
pub(crate) struct SubmissionLifecycle {
    config: Arc<LifecycleConfig>,
    executor: Arc<dyn Executor>,
}

impl SubmissionLifecycle {
    pub(crate) fn new(config: LifecycleConfig, executor: Arc<dyn Executor>) -> Self {
        Self { config: Arc::new(config), executor }
    }

    pub(crate) fn executor_backend(&self) -> &'static str {
        self.executor.backend()
    }

    /// Persists a pending submission, then hands it to the executor.
    ///
    /// The row is committed before dispatch so a fast callback always finds
    /// it. A failed dispatch is not an error for the caller: the submission
    /// is returned in `error` state with the reason in `output`.
    pub(crate) async fn create_submission(
        &self,
        db: &PgPool,
        caller: &Caller,
        problem_id: i64,
        language: &str,
        code: &str,
    ) -> Result<Submission, LifecycleError> {
        if caller.role != UserRole::Student {
            return Err(LifecycleError::Authorization("Only students can submit solutions"));
        }

        let problem = repositories::problems::find_by_id(db, problem_id)
            .await?
            .ok_or(LifecycleError::NotFound("Problem not found"))?;

        if repositories::assignments::find_for_pair(db, &caller.user_id, problem_id)
            .await?
            .is_none()
        {
            return Err(LifecycleError::Authorization("Problem is not assigned to you"));
        }

        if !problem.is_open {
            return Err(LifecycleError::Validation(
                "Problem is closed for submissions".to_string(),
            ));
        }

        let language = language.trim().to_ascii_lowercase();
        if !problem.allows_language(&language) {
            return Err(LifecycleError::Validation(format!(
                "Language '{language}' is not allowed for this problem"
            )));
        }

        if code.trim().is_empty() {
            return Err(LifecycleError::Validation("Code must not be empty".to_string()));
        }
        if code.len() > self.config.max_code_bytes {
            return Err(LifecycleError::Validation(format!(
                "Code exceeds the maximum size of {} bytes",
                self.config.max_code_bytes
            )));
        }

        let cases = repositories::test_cases::list_by_problem(db, problem_id).await?;
        let total_score = scoring::effective_total(
            problem.scoring_policy,
            &score_inputs(&cases),
            problem.total_score,
        )
        .ok_or_else(|| {
            LifecycleError::Validation("Problem total score is out of range".to_string())
        })?;
        let code_hash = hex::encode(Sha256::digest(code.as_bytes()));

        let submission = repositories::submissions::create_pending(
            db,
            CreateSubmission {
                student_id: &caller.user_id,
                problem_id,
                language: &language,
                code,
                code_hash: &code_hash,
                total_score,
                submitted_at: primitive_now_utc(),
            },
        )
        .await?;
        metrics::submission_created(&language);

        tracing::info!(
            submission_id = submission.id,
            problem_id,
            student_id = %caller.user_id,
            language = %language,
            total_score,
            "Submission created"
        );

        let job = self.build_job(&submission, &problem, &cases);
        let started = Instant::now();
        let dispatched = self.executor.dispatch(&job).await;
        metrics::dispatch_finished(
            self.executor.backend(),
            dispatched.is_ok(),
            started.elapsed().as_secs_f64(),
        );

        let Err(err) = dispatched else {
            tracing::info!(
                submission_id = submission.id,
                backend = self.executor.backend(),
                "Grading job dispatched"
            );
            return Ok(submission);
        };

        tracing::warn!(
            submission_id = submission.id,
            backend = self.executor.backend(),
            error = %err,
            "Grading dispatch failed; marking submission as error"
        );

        let diagnostic = format!("Failed to dispatch submission for grading: {err}");
        match repositories::submissions::mark_dispatch_failed(
            db,
            submission.id,
            &diagnostic,
            primitive_now_utc(),
        )
        .await?
        {
            Some(failed) => Ok(failed),
            // A callback got there first; report what it wrote.
            None => repositories::submissions::find_by_id(db, submission.id)
                .await?
                .ok_or(LifecycleError::NotFound("Submission not found")),
        }
    }

    /// Assembles the job description for one submission. Scores come from
    /// the problem's policy against the snapshot taken at submission time.
    pub(crate) fn build_job(
        &self,
        submission: &Submission,
        problem: &Problem,
        cases: &[TestCase],
    ) -> GradingJob {
        let scores = scoring::case_scores(
            problem.scoring_policy,
            &score_inputs(cases),
            submission.total_score,
        );

        GradingJob {
            submission_id: submission.id,
            language: submission.language.clone(),
            code: submission.code.clone(),
            test_cases: cases
                .iter()
                .zip(scores)
                .map(|(case, score)| TestCasePayload {
                    input: case.input.clone(),
                    expected_output: case.expected_output.clone(),
                    visibility: case.visibility,
                    score,
                })
                .collect(),
            total_score: submission.total_score,
            callback_url: self.config.callback_url.clone(),
            api_key: self.config.api_key.clone(),
        }
    }

    /// Applies an executor result. All writes happen in one transaction with
    /// the submission and assignment rows locked; any failure rolls back.
    pub(crate) async fn apply_callback(
        &self,
        db: &PgPool,
        payload: &CallbackPayload,
    ) -> Result<CallbackOutcome, LifecycleError> {
        let presented = payload.api_key.as_deref().unwrap_or_default();
        if self.config.api_key.is_empty() || presented != self.config.api_key {
            tracing::warn!(submission_id = payload.submission_id, "Callback rejected: bad API key");
            metrics::callback_handled("forbidden");
            return Err(LifecycleError::Authentication("Invalid API key"));
        }

        let mut tx = db.begin().await?;

        let Some(submission) =
            repositories::submissions::lock_by_id(&mut *tx, payload.submission_id).await?
        else {
            tracing::warn!(
                submission_id = payload.submission_id,
                "Callback for unknown submission"
            );
            metrics::callback_handled("not_found");
            return Err(LifecycleError::NotFound("Submission not found"));
        };

        if submission.status.is_terminal() {
            tracing::info!(
                submission_id = submission.id,
                status = submission.status.as_str(),
                "Ignoring callback for already graded submission"
            );
            metrics::callback_handled("duplicate");
            return Ok(CallbackOutcome { applied: false, best_score_updated: false, submission });
        }

        if payload.score_achieved < 0 || payload.score_achieved > submission.total_score {
            metrics::callback_handled("invalid");
            return Err(LifecycleError::Validation(format!(
                "score_achieved must be between 0 and {}",
                submission.total_score
            )));
        }

        if let Some(reported) = payload.total_score {
            if reported != submission.total_score {
                tracing::warn!(
                    submission_id = submission.id,
                    reported,
                    snapshot = submission.total_score,
                    "Callback total_score differs from snapshot; keeping snapshot"
                );
            }
        }

        let now = primitive_now_utc();
        let status: SubmissionStatus = payload.status.into();
        let updated = repositories::submissions::record_result(
            &mut *tx,
            submission.id,
            GradingResult {
                status,
                score_achieved: payload.score_achieved,
                output: payload.output.as_deref().unwrap_or_default(),
                graded_at: now,
            },
        )
        .await?;

        let mut best_score_updated = false;
        match repositories::assignments::lock_for_pair(
            &mut *tx,
            &updated.student_id,
            updated.problem_id,
        )
        .await?
        {
            Some(assignment) => {
                if assignment.best_score.map_or(true, |best| updated.score_achieved > best) {
                    repositories::assignments::record_best(
                        &mut *tx,
                        assignment.id,
                        updated.score_achieved,
                        updated.id,
                        now,
                    )
                    .await?;
                    best_score_updated = true;
                }
            }
            None => {
                tracing::error!(
                    submission_id = updated.id,
                    student_id = %updated.student_id,
                    problem_id = updated.problem_id,
                    "No assignment for graded submission; best score not tracked"
                );
            }
        }

        tx.commit().await?;
        metrics::callback_handled("applied");

        tracing::info!(
            submission_id = updated.id,
            status = updated.status.as_str(),
            score = updated.score_achieved,
            best_score_updated,
            "Callback applied"
        );

        Ok(CallbackOutcome { applied: true, best_score_updated, submission: updated })
    }

    /// Read-only status lookup for the owning student or the problem's creator.
    pub(crate) async fn poll(
        &self,
        db: &PgPool,
        caller: &Caller,
        submission_id: i64,
    ) -> Result<Submission, LifecycleError> {
        let submission = repositories::submissions::find_by_id(db, submission_id)
            .await?
            .ok_or(LifecycleError::NotFound("Submission not found"))?;

        let allowed = match caller.role {
            UserRole::Student => submission.student_id == caller.user_id,
            UserRole::Instructor => repositories::problems::find_by_id(db, submission.problem_id)
                .await?
                .is_some_and(|problem| problem.created_by == caller.user_id),
        };

        if !allowed {
            return Err(LifecycleError::Authorization("Not allowed to view this submission"));
        }

        Ok(submission)
    }

    pub(crate) async fn list_own(
        &self,
        db: &PgPool,
        caller: &Caller,
        problem_id: Option<i64>,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<SubmissionListRow>, i64), LifecycleError> {
        if caller.role != UserRole::Student {
            return Err(LifecycleError::Authorization("Only students have submissions"));
        }

        let page = repositories::submissions::list_for_student(
            db,
            &caller.user_id,
            problem_id,
            skip,
            limit,
        )
        .await?;
        Ok(page)
    }

    pub(crate) async fn list_for_problem(
        &self,
        db: &PgPool,
        caller: &Caller,
        problem_id: i64,
        skip: i64,
        limit: i64,
    ) -> Result<(Vec<SubmissionListRow>, i64), LifecycleError> {
        if caller.role != UserRole::Instructor {
            return Err(LifecycleError::Authorization("Instructor access required"));
        }

        let problem = repositories::problems::find_by_id(db, problem_id)
            .await?
            .ok_or(LifecycleError::NotFound("Problem not found"))?;
        if problem.created_by != caller.user_id {
            return Err(LifecycleError::Authorization("Not the creator of this problem"));
        }

        Ok(repositories::submissions::list_by_problem(db, problem_id, skip, limit).await?)
    }
}

fn score_inputs(cases: &[TestCase]) -> Vec<(Visibility, i32)> {
    cases.iter().map(|case| (case.visibility, case.score)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::ScoringPolicy;
    use crate::schemas::submission::ReportedStatus;
    use crate::services::executor::DisabledExecutor;

    fn lifecycle(api_key: &str) -> SubmissionLifecycle {
        SubmissionLifecycle::new(
            LifecycleConfig {
                callback_url: "http://portal.test/api/v1/executor/callback".to_string(),
                api_key: api_key.to_string(),
                max_code_bytes: 1024,
            },
            Arc::new(DisabledExecutor),
        )
    }

    fn problem(policy: ScoringPolicy, total_score: i32) -> Problem {
        let now = primitive_now_utc();
        Problem {
            id: 3,
            title: "Echo".to_string(),
            description: "Print the input".to_string(),
            created_by: "instructor-1".to_string(),
            is_open: true,
            total_score,
            scoring_policy: policy,
            allowed_languages: vec!["python".to_string()],
            created_at: now,
            updated_at: now,
        }
    }

    fn case(id: i64, visibility: Visibility, score: i32) -> TestCase {
        TestCase {
            id,
            problem_id: 3,
            visibility,
            input: format!("in-{id}"),
            expected_output: format!("out-{id}"),
            score,
            order_index: i32::try_from(id).unwrap(),
            created_at: primitive_now_utc(),
        }
    }

    fn submission(total_score: i32) -> Submission {
        Submission {
            id: 41,
            student_id: "student-1".to_string(),
            problem_id: 3,
            language: "python".to_string(),
            code: "print(input())".to_string(),
            code_hash: String::new(),
            status: SubmissionStatus::Pending,
            score_achieved: 0,
            total_score,
            output: None,
            submitted_at: primitive_now_utc(),
            graded_at: None,
        }
    }

    fn callback(api_key: Option<&str>) -> CallbackPayload {
        CallbackPayload {
            submission_id: 41,
            status: ReportedStatus::Passed,
            score_achieved: 10,
            total_score: Some(10),
            output: Some("ok".to_string()),
            api_key: api_key.map(str::to_string),
        }
    }

    #[test]
    fn build_job_carries_all_cases_with_policy_scores() {
        let lifecycle = lifecycle("secret");
        let cases = vec![
            case(1, Visibility::Public, 0),
            case(2, Visibility::Private, 0),
            case(3, Visibility::Private, 0),
        ];

        let job = lifecycle.build_job(&submission(9), &problem(ScoringPolicy::Equal, 9), &cases);

        assert_eq!(job.submission_id, 41);
        assert_eq!(job.language, "python");
        assert_eq!(job.total_score, 9);
        assert_eq!(job.api_key, "secret");
        assert_eq!(job.callback_url, "http://portal.test/api/v1/executor/callback");
        let scores: Vec<i32> = job.test_cases.iter().map(|case| case.score).collect();
        assert_eq!(scores, vec![0, 5, 4]);
        assert_eq!(job.test_cases[0].visibility, Visibility::Public);
        assert_eq!(job.test_cases[2].input, "in-3");
    }

    #[test]
    fn build_job_uses_declared_scores_for_custom_policy() {
        let lifecycle = lifecycle("secret");
        let cases = vec![case(1, Visibility::Private, 30), case(2, Visibility::Private, 70)];

        let job =
            lifecycle.build_job(&submission(100), &problem(ScoringPolicy::Custom, 100), &cases);

        let scores: Vec<i32> = job.test_cases.iter().map(|case| case.score).collect();
        assert_eq!(scores, vec![30, 70]);
    }

    #[tokio::test]
    async fn callback_with_wrong_or_missing_key_is_rejected_before_storage() {
        // Never connects: authentication fails before the pool is used.
        let pool = PgPool::connect_lazy("postgres://nobody@127.0.0.1:1/none").unwrap();
        let lifecycle = lifecycle("secret");

        for key in [None, Some(""), Some("wrong")] {
            let err = lifecycle.apply_callback(&pool, &callback(key)).await.unwrap_err();
            assert!(matches!(err, LifecycleError::Authentication(_)));
        }
    }

    #[tokio::test]
    async fn empty_configured_key_rejects_every_callback() {
        let pool = PgPool::connect_lazy("postgres://nobody@127.0.0.1:1/none").unwrap();
        let lifecycle = lifecycle("");

        let err = lifecycle.apply_callback(&pool, &callback(Some(""))).await.unwrap_err();
        assert!(matches!(err, LifecycleError::Authentication(_)));
    }

    #[tokio::test]
    async fn instructors_cannot_create_submissions() {
        let pool = PgPool::connect_lazy("postgres://nobody@127.0.0.1:1/none").unwrap();
        let caller = Caller { user_id: "instructor-1".to_string(), role: UserRole::Instructor };

        let err = lifecycle("secret")
            .create_submission(&pool, &caller, 3, "python", "print(1)")
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Authorization(_)));
    }
}
