//! User-facing operations: register, submit, follow up, view, browse.
//!
//! Each operation validates its input, consults the [`Judge`] where a verdict
//! is needed, and persists through a [`SubmissionStore`].

use std::sync::Arc;

use tracing::info;

use crate::gateway::Attribution;
use crate::judge::Judge;
use crate::store::{
    FeedPage, FeedQuery, NewSubmission, NewUser, StoreError, Submission, SubmissionStore, User,
};

const MIN_USERNAME_CHARS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("access denied")]
    Forbidden,
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Store(other),
        }
    }
}

impl ServiceError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::Forbidden => "forbidden",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::Store(_) => "store",
        }
    }
}

#[derive(Clone)]
pub struct SubmissionService<S: SubmissionStore> {
    judge: Judge,
    store: Arc<S>,
}

impl<S: SubmissionStore> SubmissionService<S> {
    pub fn new(judge: Judge, store: Arc<S>) -> Self {
        Self { judge, store }
    }

    pub fn judge(&self) -> &Judge {
        &self.judge
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub async fn register(&self, username: &str, email: &str) -> Result<User, ServiceError> {
        let username = username.trim();
        let email = email.trim();
        if username.chars().count() < MIN_USERNAME_CHARS {
            return Err(ServiceError::Validation(format!(
                "username must be at least {MIN_USERNAME_CHARS} characters"
            )));
        }
        if email.is_empty() {
            return Err(ServiceError::Validation("email is required".to_string()));
        }

        let user = self
            .store
            .create_user(&NewUser {
                username: username.to_string(),
                email: email.to_string(),
            })
            .await?;
        info!(user_id = user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Resolve a username or email to a user.
    pub async fn user(&self, login: &str) -> Result<User, ServiceError> {
        self.store
            .find_user(login.trim())
            .await?
            .ok_or(ServiceError::NotFound("user"))
    }

    /// Judge and persist a new situation.
    pub async fn submit(
        &self,
        user_id: i64,
        situation: &str,
        is_anonymous: bool,
        is_public: bool,
    ) -> Result<Submission, ServiceError> {
        let situation = situation.trim();
        if situation.is_empty() {
            return Err(ServiceError::Validation("situation is required".to_string()));
        }

        let attribution = Attribution::new("submit").with_user(user_id);
        let judgment = self
            .judge
            .judge_with(situation, None, attribution, None)
            .await;

        let submission = self
            .store
            .insert_submission(&NewSubmission {
                user_id,
                situation: situation.to_string(),
                is_anonymous,
                is_public,
                judgment,
            })
            .await?;
        info!(
            submission_id = submission.id,
            user_id,
            verdict = submission.verdict.as_str(),
            "submission stored"
        );
        Ok(submission)
    }

    /// Re-judge an owned submission with extra context.
    pub async fn follow_up(
        &self,
        user_id: i64,
        submission_id: i64,
        context: &str,
    ) -> Result<Submission, ServiceError> {
        let context = context.trim();
        if submission_id <= 0 || context.is_empty() {
            return Err(ServiceError::Validation(
                "submission id and follow-up context are required".to_string(),
            ));
        }

        let existing = self
            .store
            .get_submission(submission_id)
            .await?
            .ok_or(ServiceError::NotFound("submission"))?;
        if existing.user_id != Some(user_id) {
            return Err(ServiceError::Forbidden);
        }

        let attribution = Attribution::new("follow_up")
            .with_user(user_id)
            .with_submission(submission_id);
        let judgment = self
            .judge
            .judge_with(&existing.situation, Some(context), attribution, None)
            .await;

        self.store
            .update_judgment(submission_id, context, &judgment)
            .await?;
        info!(
            submission_id,
            user_id,
            verdict = judgment.verdict().as_str(),
            "follow-up judged"
        );

        Ok(Submission {
            follow_up_context: Some(context.to_string()),
            verdict: judgment.verdict(),
            score: judgment.score(),
            reasoning: judgment.reasoning().to_string(),
            provenance: Some(judgment.provenance),
            ..existing
        }
        .annotated(&judgment))
    }

    /// Fetch one submission as `viewer` would see it.
    pub async fn view(&self, viewer: Option<i64>, id: i64) -> Result<Submission, ServiceError> {
        let submission = self
            .store
            .get_submission(id)
            .await?
            .ok_or(ServiceError::NotFound("submission"))?;
        if !submission.is_public && (viewer.is_none() || submission.user_id != viewer) {
            return Err(ServiceError::Forbidden);
        }
        Ok(submission)
    }

    pub async fn feed(&self, query: &FeedQuery) -> Result<FeedPage, ServiceError> {
        Ok(self.store.list_feed(query).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteSubmissionStore;

    fn service() -> SubmissionService<SqliteSubmissionStore> {
        let store = SqliteSubmissionStore::in_memory().expect("store");
        SubmissionService::new(Judge::rules_only().with_seed(7), Arc::new(store))
    }

    #[tokio::test]
    async fn register_validates_input() {
        let svc = service();
        assert!(matches!(
            svc.register("ab", "ab@example.com").await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            svc.register("abc", "   ").await,
            Err(ServiceError::Validation(_))
        ));
        svc.register("abc", "abc@example.com").await.expect("register");
        let err = svc.register("abc", "other@example.com").await.unwrap_err();
        assert_eq!(err.code(), "conflict");
    }

    #[tokio::test]
    async fn blank_situation_is_rejected() {
        let svc = service();
        let user = svc.register("alice", "alice@example.com").await.unwrap();
        let err = svc.submit(user.id, "   \n ", false, true).await.unwrap_err();
        assert_eq!(err.to_string(), "situation is required");
    }

    #[tokio::test]
    async fn submit_trims_and_judges() {
        let svc = service();
        let user = svc.register("alice", "alice@example.com").await.unwrap();
        let sub = svc
            .submit(user.id, "  I kicked my neighbor's dog  ", false, true)
            .await
            .unwrap();
        assert_eq!(sub.situation, "I kicked my neighbor's dog");
        assert_eq!(sub.score, 10);
        assert_eq!(sub.username.as_deref(), Some("alice"));
    }
}
