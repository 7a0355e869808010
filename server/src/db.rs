use futures::future::BoxFuture;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::BackendError;
use crate::submission::{NewSubmission, Submission};

pub mod memory;

/// The privacy filter applied to reads of the submissions collection.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    All,
}

pub trait Db {
    fn count(&self, visibility: Visibility) -> BoxFuture<Result<i64, BackendError>>;

    /// Creates exactly one record, assigning its ID and creation time.
    fn insert(&self, submission: NewSubmission) -> BoxFuture<Result<Submission, BackendError>>;

    fn retrieve(&self, id: &Uuid) -> BoxFuture<Result<Option<Submission>, BackendError>>;

    /// Lists submissions ordered by creation time descending.
    fn retrieve_all(
        &self,
        visibility: Visibility,
    ) -> BoxFuture<Result<Vec<Submission>, BackendError>>;

    /// The single most recent submission, the watcher's subscription query.
    fn retrieve_latest(&self) -> BoxFuture<Result<Option<Submission>, BackendError>>;

    /// Sets the featured flag and stamps `featured_updated_at`.
    fn set_featured(
        &self,
        id: &Uuid,
        is_featured: bool,
    ) -> BoxFuture<Result<Submission, BackendError>>;

    /// Sets the highlighted reflection and stamps its timestamp.
    fn set_highlighted(
        &self,
        id: &Uuid,
        highlighted: String,
    ) -> BoxFuture<Result<Submission, BackendError>>;
}

pub use self::postgres::*;

mod postgres {
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use sqlx::postgres::{PgPool, PgRow};
    use sqlx::Row;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::Visibility;
    use crate::errors::BackendError;
    use crate::submission::{NewSubmission, Submission};

    pub struct PgDb {
        pool: PgPool,
    }

    impl PgDb {
        pub fn new(pool: PgPool) -> Self {
            PgDb { pool }
        }
    }

    // these can be simplified once async functions in traits are stabilized
    impl super::Db for PgDb {
        fn count(&self, visibility: Visibility) -> BoxFuture<Result<i64, BackendError>> {
            async move {
                let (count,): (i64,) = match privacy_filter(visibility) {
                    Some(is_private) => {
                        sqlx::query_as(include_str!("queries/count_by_privacy.sql"))
                            .bind(is_private)
                            .fetch_one(&self.pool)
                            .await
                    }
                    None => {
                        sqlx::query_as(include_str!("queries/count.sql"))
                            .fetch_one(&self.pool)
                            .await
                    }
                }
                .map_err(map_sqlx_error)?;

                Ok(count)
            }
            .boxed()
        }

        fn insert(&self, submission: NewSubmission) -> BoxFuture<Result<Submission, BackendError>> {
            async move {
                let query = sqlx::query(include_str!("queries/create.sql"));

                let created = query
                    .bind(&submission.email)
                    .bind(submission.age)
                    .bind(&submission.district)
                    .bind(&submission.occupation_status)
                    .bind(&submission.other_occupation)
                    .bind(&submission.sector_interest)
                    .bind(&submission.other_sector)
                    .bind(&submission.values)
                    .bind(&submission.other_value)
                    .bind(&submission.obstacles)
                    .bind(&submission.other_obstacle)
                    .bind(&submission.question1)
                    .bind(submission.is_private)
                    .try_map(|row: PgRow| submission_from_row(&row))
                    .fetch_one(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(created)
            }
            .boxed()
        }

        fn retrieve(&self, id: &Uuid) -> BoxFuture<Result<Option<Submission>, BackendError>> {
            let id = *id;

            async move {
                let submission = sqlx::query(include_str!("queries/retrieve.sql"))
                    .bind(id)
                    .try_map(|row: PgRow| submission_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(submission)
            }
            .boxed()
        }

        fn retrieve_all(
            &self,
            visibility: Visibility,
        ) -> BoxFuture<Result<Vec<Submission>, BackendError>> {
            async move {
                let submissions = match privacy_filter(visibility) {
                    Some(is_private) => {
                        sqlx::query(include_str!("queries/retrieve_by_privacy.sql"))
                            .bind(is_private)
                            .try_map(|row: PgRow| submission_from_row(&row))
                            .fetch_all(&self.pool)
                            .await
                    }
                    None => {
                        sqlx::query(include_str!("queries/retrieve_all.sql"))
                            .try_map(|row: PgRow| submission_from_row(&row))
                            .fetch_all(&self.pool)
                            .await
                    }
                }
                .map_err(map_sqlx_error)?;

                Ok(submissions)
            }
            .boxed()
        }

        fn retrieve_latest(&self) -> BoxFuture<Result<Option<Submission>, BackendError>> {
            async move {
                let submission = sqlx::query(include_str!("queries/retrieve_latest.sql"))
                    .try_map(|row: PgRow| submission_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                Ok(submission)
            }
            .boxed()
        }

        fn set_featured(
            &self,
            id: &Uuid,
            is_featured: bool,
        ) -> BoxFuture<Result<Submission, BackendError>> {
            let id = *id;

            async move {
                let submission = sqlx::query(include_str!("queries/set_featured.sql"))
                    .bind(id)
                    .bind(is_featured)
                    .try_map(|row: PgRow| submission_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                submission.ok_or(BackendError::NonExistentId(id))
            }
            .boxed()
        }

        fn set_highlighted(
            &self,
            id: &Uuid,
            highlighted: String,
        ) -> BoxFuture<Result<Submission, BackendError>> {
            let id = *id;

            async move {
                let submission = sqlx::query(include_str!("queries/set_highlighted.sql"))
                    .bind(id)
                    .bind(highlighted)
                    .try_map(|row: PgRow| submission_from_row(&row))
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_sqlx_error)?;

                submission.ok_or(BackendError::NonExistentId(id))
            }
            .boxed()
        }
    }

    fn privacy_filter(visibility: Visibility) -> Option<bool> {
        match visibility {
            Visibility::Public => Some(false),
            Visibility::Private => Some(true),
            Visibility::All => None,
        }
    }

    fn submission_from_row(row: &PgRow) -> Result<Submission, sqlx::Error> {
        Ok(Submission {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            age: row.try_get("age")?,
            district: row.try_get("district")?,
            occupation_status: row.try_get("occupation_status")?,
            other_occupation: row.try_get("other_occupation")?,
            sector_interest: row.try_get("sector_interest")?,
            other_sector: row.try_get("other_sector")?,
            values: row.try_get("values")?,
            other_value: row.try_get("other_value")?,
            obstacles: row.try_get("obstacles")?,
            other_obstacle: row.try_get("other_obstacle")?,
            question1: row.try_get("question1")?,
            question1_highlighted: row.try_get("question1_highlighted")?,
            is_private: row.try_get("is_private")?,
            is_featured: row.try_get("is_featured")?,
            submitted_at: row.try_get::<Option<OffsetDateTime>, _>("submitted_at")?,
            featured_updated_at: row.try_get("featured_updated_at")?,
            question1_highlighted_updated_at: row
                .try_get("question1_highlighted_updated_at")?,
        })
    }

    fn map_sqlx_error(error: sqlx::Error) -> BackendError {
        BackendError::Sqlx { source: error }
    }
}
