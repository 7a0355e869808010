//! An in-memory [`Db`] used in tests in place of the hosted store.

use std::sync::RwLock;

use futures::future::{BoxFuture, FutureExt};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{Db, Visibility};
use crate::errors::BackendError;
use crate::submission::{NewSubmission, Submission};

#[derive(Default)]
pub struct MemoryDb {
    submissions: RwLock<Vec<Submission>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding the given records as-is, timestamps included.
    pub fn seeded(submissions: Vec<Submission>) -> Self {
        MemoryDb {
            submissions: RwLock::new(submissions),
        }
    }

    fn matching(&self, visibility: Visibility) -> Vec<Submission> {
        let mut matching: Vec<Submission> = self
            .submissions
            .read()
            .unwrap()
            .iter()
            .filter(|s| match visibility {
                Visibility::Public => !s.is_private,
                Visibility::Private => s.is_private,
                Visibility::All => true,
            })
            .cloned()
            .collect();

        // newest first, records without a creation time last
        matching.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));

        matching
    }

    fn update<F>(&self, id: &Uuid, apply: F) -> Result<Submission, BackendError>
    where
        F: FnOnce(&mut Submission),
    {
        let mut submissions = self.submissions.write().unwrap();

        let submission = submissions
            .iter_mut()
            .find(|s| s.id == *id)
            .ok_or(BackendError::NonExistentId(*id))?;

        apply(submission);

        Ok(submission.clone())
    }
}

impl Db for MemoryDb {
    fn count(&self, visibility: Visibility) -> BoxFuture<Result<i64, BackendError>> {
        let count = self.matching(visibility).len() as i64;

        async move { Ok(count) }.boxed()
    }

    fn insert(&self, submission: NewSubmission) -> BoxFuture<Result<Submission, BackendError>> {
        let created = Submission {
            id: Uuid::new_v4(),
            email: Some(submission.email),
            age: submission.age,
            district: submission.district,
            occupation_status: submission.occupation_status,
            other_occupation: submission.other_occupation,
            sector_interest: submission.sector_interest,
            other_sector: submission.other_sector,
            values: submission.values,
            other_value: submission.other_value,
            obstacles: submission.obstacles,
            other_obstacle: submission.other_obstacle,
            question1: submission.question1,
            question1_highlighted: None,
            is_private: submission.is_private,
            is_featured: false,
            submitted_at: Some(OffsetDateTime::now_utc()),
            featured_updated_at: None,
            question1_highlighted_updated_at: None,
        };

        self.submissions.write().unwrap().push(created.clone());

        async move { Ok(created) }.boxed()
    }

    fn retrieve(&self, id: &Uuid) -> BoxFuture<Result<Option<Submission>, BackendError>> {
        let submission = self
            .submissions
            .read()
            .unwrap()
            .iter()
            .find(|s| s.id == *id)
            .cloned();

        async move { Ok(submission) }.boxed()
    }

    fn retrieve_all(
        &self,
        visibility: Visibility,
    ) -> BoxFuture<Result<Vec<Submission>, BackendError>> {
        let matching = self.matching(visibility);

        async move { Ok(matching) }.boxed()
    }

    fn retrieve_latest(&self) -> BoxFuture<Result<Option<Submission>, BackendError>> {
        let latest = self.matching(Visibility::All).into_iter().next();

        async move { Ok(latest) }.boxed()
    }

    fn set_featured(
        &self,
        id: &Uuid,
        is_featured: bool,
    ) -> BoxFuture<Result<Submission, BackendError>> {
        let result = self.update(id, |s| {
            s.is_featured = is_featured;
            s.featured_updated_at = Some(OffsetDateTime::now_utc());
        });

        async move { result }.boxed()
    }

    fn set_highlighted(
        &self,
        id: &Uuid,
        highlighted: String,
    ) -> BoxFuture<Result<Submission, BackendError>> {
        let result = self.update(id, |s| {
            s.question1_highlighted = Some(highlighted);
            s.question1_highlighted_updated_at = Some(OffsetDateTime::now_utc());
        });

        async move { result }.boxed()
    }
}
