//! Pure transformations from submission lists to chart-ready summaries.
//!
//! Nothing here performs I/O. Handlers pass the current date in, so every
//! function is deterministic for a given input.

use serde::Serialize;
use time::{Date, Duration};

use crate::submission::Submission;

/// Submissions on one calendar date, split by privacy setting.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DailyCount {
    pub date: Date,
    pub public: u32,
    pub private: u32,
}

/// One grouped category and how many submissions fall under it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: u32,
}

/// A featured public reflection prepared for promotional display.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Testimonial {
    pub quote: String,
    pub occupation: String,
    pub sector: String,
}

/// Headline numbers for the dashboard statistics cards.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Overview {
    pub total: u32,
    pub public: u32,
    pub private: u32,
    pub average_age: Option<i32>,
    pub youngest: Option<i32>,
    pub oldest: Option<i32>,
    pub districts_covered: u32,
}

/// The canonical age buckets. The source dashboards disagreed on the
/// thresholds; this four-bucket policy is applied everywhere.
pub fn age_bucket(age: i32) -> &'static str {
    if age < 18 {
        "Under 18"
    } else if age <= 35 {
        "18-35"
    } else if age <= 55 {
        "36-55"
    } else {
        "56+"
    }
}

/// Groups submissions by the UTC calendar date of their creation time over
/// the trailing window of `days` ending at `today` inclusive.
///
/// The result always holds exactly `days` entries in ascending date order,
/// zero-filled where no submissions exist. Records without a creation time
/// are excluded here (and only here).
pub fn daily_counts(submissions: &[Submission], days: u16, today: Date) -> Vec<DailyCount> {
    let days = i64::from(days);
    let start = today - Duration::days(days - 1);

    let mut counts: Vec<DailyCount> = (0..days)
        .map(|offset| DailyCount {
            date: start + Duration::days(offset),
            public: 0,
            private: 0,
        })
        .collect();

    for submission in submissions {
        let date = match submission.submitted_at {
            Some(at) => at.date(),
            None => continue,
        };

        if date < start || date > today {
            continue;
        }

        let index = (date - start).whole_days() as usize;

        if submission.is_private {
            counts[index].private += 1;
        } else {
            counts[index].public += 1;
        }
    }

    counts
}

pub fn district_counts(submissions: &[Submission]) -> Vec<CategoryCount> {
    count_by(submissions.iter().map(|s| s.district.as_str()))
}

/// Occupation counts with the "Other" category folded into its free-text
/// override where one was provided.
pub fn occupation_counts(submissions: &[Submission]) -> Vec<CategoryCount> {
    count_by(submissions.iter().map(|s| s.folded_occupation()))
}

pub fn sector_counts(submissions: &[Submission]) -> Vec<CategoryCount> {
    count_by(submissions.iter().map(|s| s.folded_sector()))
}

pub fn age_group_counts(submissions: &[Submission]) -> Vec<CategoryCount> {
    count_by(submissions.iter().map(|s| age_bucket(s.age)))
}

pub fn value_counts(submissions: &[Submission]) -> Vec<CategoryCount> {
    count_by(
        submissions
            .iter()
            .flat_map(|s| s.values.iter().map(String::as_str)),
    )
}

pub fn obstacle_counts(submissions: &[Submission]) -> Vec<CategoryCount> {
    count_by(
        submissions
            .iter()
            .flat_map(|s| s.obstacles.iter().map(String::as_str)),
    )
}

/// Maps featured public submissions to quotes for the testimonial
/// carousel, preferring the highlighted variant of the reflection.
pub fn testimonials(submissions: &[Submission]) -> Vec<Testimonial> {
    submissions
        .iter()
        .filter(|s| !s.is_private && s.is_featured)
        .map(|s| Testimonial {
            quote: s
                .question1_highlighted
                .as_deref()
                .filter(|h| !h.is_empty())
                .unwrap_or(&s.question1)
                .to_owned(),
            occupation: s.folded_occupation().to_owned(),
            sector: s.folded_sector().to_owned(),
        })
        .collect()
}

pub fn overview(submissions: &[Submission]) -> Overview {
    let total = submissions.len() as u32;
    let private = submissions.iter().filter(|s| s.is_private).count() as u32;

    let ages: Vec<i32> = submissions
        .iter()
        .map(|s| s.age)
        .filter(|age| *age > 0)
        .collect();

    let average_age = if ages.is_empty() {
        None
    } else {
        let sum: i64 = ages.iter().map(|age| i64::from(*age)).sum();
        Some((sum as f64 / ages.len() as f64).round() as i32)
    };

    let mut districts: Vec<&str> = submissions.iter().map(|s| s.district.as_str()).collect();
    districts.sort_unstable();
    districts.dedup();

    Overview {
        total,
        public: total - private,
        private,
        average_age,
        youngest: ages.iter().min().copied(),
        oldest: ages.iter().max().copied(),
        districts_covered: districts.len() as u32,
    }
}

/// Groups the given labels, counts them and sorts descending by count.
/// The sort is stable over first-encountered order, so ties keep the
/// order in which the labels appeared.
fn count_by<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<CategoryCount> {
    let mut counts: Vec<CategoryCount> = vec![];

    for label in labels {
        match counts.iter_mut().find(|c| c.label == label) {
            Some(existing) => existing.count += 1,
            None => counts.push(CategoryCount {
                label: label.to_owned(),
                count: 1,
            }),
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));

    counts
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::*;

    fn submission(at: Option<OffsetDateTime>, is_private: bool) -> Submission {
        Submission {
            id: Uuid::new_v4(),
            email: None,
            age: 24,
            district: "Brunei-Muara".into(),
            occupation_status: "Student".into(),
            other_occupation: None,
            sector_interest: "STEM".into(),
            other_sector: None,
            values: vec!["Growth".into()],
            other_value: None,
            obstacles: vec!["I'm afraid of failing".into()],
            other_obstacle: None,
            question1: "Plant more trees.".into(),
            question1_highlighted: None,
            is_private,
            is_featured: false,
            submitted_at: at,
            featured_updated_at: None,
            question1_highlighted_updated_at: None,
        }
    }

    #[test]
    fn daily_counts_zero_fills_the_whole_window() {
        let today = date!(2025 - 07 - 20);
        let submissions = vec![
            submission(Some(datetime!(2025-07-20 08:00 UTC)), false),
            submission(Some(datetime!(2025-07-20 09:30 UTC)), true),
            submission(Some(datetime!(2025-07-16 23:59 UTC)), false),
            // outside the window
            submission(Some(datetime!(2025-07-01 12:00 UTC)), false),
            // no creation time
            submission(None, false),
        ];

        let counts = daily_counts(&submissions, 7, today);

        assert_eq!(counts.len(), 7);
        assert_eq!(counts[0].date, date!(2025 - 07 - 14));
        assert_eq!(counts[6].date, date!(2025 - 07 - 20));
        assert_eq!(counts[6].public, 1);
        assert_eq!(counts[6].private, 1);
        assert_eq!(counts[2].public, 1);

        let total: u32 = counts.iter().map(|c| c.public + c.private).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn daily_counts_of_nothing_is_all_zeroes() {
        let counts = daily_counts(&[], 14, date!(2025 - 07 - 20));

        assert_eq!(counts.len(), 14);
        assert!(counts.iter().all(|c| c.public == 0 && c.private == 0));
    }

    #[test]
    fn categorical_counts_sort_descending_with_stable_ties() {
        let mut a = submission(None, false);
        a.values = vec!["Peace".into(), "Growth".into()];
        let mut b = submission(None, false);
        b.values = vec!["Family".into(), "Growth".into()];

        let counts = value_counts(&[a, b]);

        assert_eq!(counts[0].label, "Growth");
        assert_eq!(counts[0].count, 2);
        // ties keep first-encountered order
        assert_eq!(counts[1].label, "Peace");
        assert_eq!(counts[2].label, "Family");
        assert!(counts.windows(2).all(|w| w[0].count >= w[1].count));
    }

    #[test]
    fn occupation_other_folds_into_free_text() {
        let mut s = submission(None, false);
        s.occupation_status = "Other".into();
        s.other_occupation = Some("Falconer".into());

        let counts = occupation_counts(&[s]);

        assert_eq!(counts[0].label, "Falconer");
    }

    #[test]
    fn age_buckets_follow_the_canonical_policy() {
        assert_eq!(age_bucket(17), "Under 18");
        assert_eq!(age_bucket(18), "18-35");
        assert_eq!(age_bucket(35), "18-35");
        assert_eq!(age_bucket(36), "36-55");
        assert_eq!(age_bucket(56), "56+");
    }

    #[test]
    fn testimonials_prefer_highlighted_text() {
        let mut featured = submission(None, false);
        featured.is_featured = true;
        featured.question1_highlighted = Some("Plant **more trees**.".into());

        let mut private_featured = submission(None, true);
        private_featured.is_featured = true;

        let plain = submission(None, false);

        let quotes = testimonials(&[featured, private_featured, plain]);

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].quote, "Plant **more trees**.");
        assert_eq!(quotes[0].occupation, "Student");
    }

    #[test]
    fn overview_ignores_non_positive_ages() {
        let mut a = submission(None, false);
        a.age = 20;
        let mut b = submission(None, true);
        b.age = 0;
        b.district = "Belait".into();

        let stats = overview(&[a, b]);

        assert_eq!(stats.total, 2);
        assert_eq!(stats.public, 1);
        assert_eq!(stats.private, 1);
        assert_eq!(stats.average_age, Some(20));
        assert_eq!(stats.youngest, Some(20));
        assert_eq!(stats.districts_covered, 2);
    }
}
