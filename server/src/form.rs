//! The multi-step submission form, modelled as an explicit state machine.
//!
//! Forward navigation is blocked until the current step's predicate holds;
//! back navigation is unrestricted. Completing the final step produces a
//! validated [`NewSubmission`]; local state is reset only after the caller
//! reports a successful write, so a failed write keeps everything intact
//! for retry.

use crate::errors::BackendError;
use crate::submission::{NewSubmission, MAX_VALUES, OTHER};

/// The fixed steps of the form, in order.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Step {
    Reflection,
    Obstacles,
    Values,
    Email,
    Demographics,
    Privacy,
}

impl Step {
    fn next(self) -> Option<Step> {
        use Step::*;

        match self {
            Reflection => Some(Obstacles),
            Obstacles => Some(Values),
            Values => Some(Email),
            Email => Some(Demographics),
            Demographics => Some(Privacy),
            Privacy => None,
        }
    }

    fn previous(self) -> Option<Step> {
        use Step::*;

        match self {
            Reflection => None,
            Obstacles => Some(Reflection),
            Values => Some(Obstacles),
            Email => Some(Values),
            Demographics => Some(Email),
            Privacy => Some(Demographics),
        }
    }
}

/// The accumulated answers across all steps.
#[derive(Clone, Debug, Default)]
pub struct Answers {
    pub question1: String,
    pub obstacles: Vec<String>,
    pub other_obstacle: String,
    pub values: Vec<String>,
    pub other_value: String,
    pub email: String,
    pub age: Option<i32>,
    pub district: String,
    pub occupation_status: String,
    pub other_occupation: String,
    pub sector_interest: String,
    pub other_sector: String,
    pub is_private: bool,
}

#[derive(Clone, Debug)]
pub struct FormFlow {
    step: Step,
    answers: Answers,
}

impl Default for FormFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl FormFlow {
    pub fn new() -> Self {
        FormFlow {
            step: Step::Reflection,
            answers: Answers::default(),
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn answers_mut(&mut self) -> &mut Answers {
        &mut self.answers
    }

    /// Whether the current step's answers allow moving forward.
    pub fn can_proceed(&self) -> bool {
        let a = &self.answers;

        match self.step {
            Step::Reflection => !a.question1.trim().is_empty(),
            Step::Obstacles => {
                !a.obstacles.is_empty()
                    && (!a.obstacles.iter().any(|o| o == OTHER)
                        || !a.other_obstacle.trim().is_empty())
            }
            Step::Values => !a.values.is_empty(),
            Step::Email => !a.email.trim().is_empty(),
            Step::Demographics => {
                a.age.is_some()
                    && !a.district.is_empty()
                    && !a.occupation_status.is_empty()
                    && !a.sector_interest.is_empty()
                    && (a.occupation_status != OTHER || !a.other_occupation.trim().is_empty())
                    && (a.sector_interest != OTHER || !a.other_sector.trim().is_empty())
            }
            Step::Privacy => true,
        }
    }

    /// Advances to the next step. Returns false if blocked, either by an
    /// unsatisfied predicate or because the form is on its last step.
    pub fn next(&mut self) -> bool {
        if !self.can_proceed() {
            return false;
        }

        match self.step.next() {
            Some(step) => {
                self.step = step;
                true
            }
            None => false,
        }
    }

    /// Steps back. Never blocked except on the first step.
    pub fn previous(&mut self) -> bool {
        match self.step.previous() {
            Some(step) => {
                self.step = step;
                true
            }
            None => false,
        }
    }

    /// Flips membership of one value. Selecting a new value when
    /// [`MAX_VALUES`] are already chosen leaves the selection unchanged.
    pub fn toggle_value(&mut self, value: &str) {
        let values = &mut self.answers.values;

        if let Some(position) = values.iter().position(|v| v == value) {
            values.remove(position);
        } else if values.len() < MAX_VALUES {
            values.push(value.to_owned());
        }
    }

    /// Flips membership of one obstacle. Obstacles are unbounded.
    pub fn toggle_obstacle(&mut self, obstacle: &str) {
        let obstacles = &mut self.answers.obstacles;

        if let Some(position) = obstacles.iter().position(|o| o == obstacle) {
            obstacles.remove(position);
        } else {
            obstacles.push(obstacle.to_owned());
        }
    }

    /// Builds the record to write. Only available on the final step, and
    /// re-validated so a record assembled here never fails at the HTTP
    /// boundary. Does not reset the form; call [`FormFlow::reset`] after
    /// the write succeeds.
    pub fn submission(&self) -> Result<NewSubmission, BackendError> {
        if self.step != Step::Privacy {
            return Err(BackendError::MalformedSubmission(
                "form is not on its final step".into(),
            ));
        }

        let a = &self.answers;

        let submission = NewSubmission {
            email: a.email.trim().to_owned(),
            age: a.age.unwrap_or(0),
            district: a.district.clone(),
            occupation_status: a.occupation_status.clone(),
            other_occupation: optional(&a.other_occupation),
            sector_interest: a.sector_interest.clone(),
            other_sector: optional(&a.other_sector),
            values: a.values.clone(),
            other_value: optional(&a.other_value),
            obstacles: a.obstacles.clone(),
            other_obstacle: optional(&a.other_obstacle),
            question1: a.question1.trim().to_owned(),
            is_private: a.is_private,
        };

        submission.validate()?;

        Ok(submission)
    }

    /// Clears every answer and returns to the first step.
    pub fn reset(&mut self) {
        *self = FormFlow::new();
    }
}

fn optional(text: &str) -> Option<String> {
    let trimmed = text.trim();

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> FormFlow {
        let mut form = FormFlow::new();
        form.answers_mut().question1 = "Open a bike repair collective.".into();
        assert!(form.next());

        form.toggle_obstacle("I'm not sure where to start");
        assert!(form.next());

        form.toggle_value("Growth");
        form.toggle_value("Creativity");
        assert!(form.next());

        form.answers_mut().email = "someone@example.com".into();
        assert!(form.next());

        {
            let a = form.answers_mut();
            a.age = Some(21);
            a.district = "Temburong".into();
            a.occupation_status = "Student".into();
            a.sector_interest = "Business".into();
        }
        assert!(form.next());

        form
    }

    #[test]
    fn forward_navigation_is_blocked_until_each_step_is_satisfied() {
        let mut form = FormFlow::new();

        assert!(!form.next());
        assert_eq!(form.step(), Step::Reflection);

        form.answers_mut().question1 = "A podcast about our district.".into();
        assert!(form.next());
        assert_eq!(form.step(), Step::Obstacles);

        // "Other" requires the free-text override
        form.toggle_obstacle("Other");
        assert!(!form.next());
        form.answers_mut().other_obstacle = "Paperwork".into();
        assert!(form.next());
    }

    #[test]
    fn back_navigation_is_unrestricted() {
        let mut form = FormFlow::new();
        assert!(!form.previous());

        form.answers_mut().question1 = "x".into();
        form.next();
        assert!(form.previous());
        assert_eq!(form.step(), Step::Reflection);
    }

    #[test]
    fn a_fourth_value_is_not_added() {
        let mut form = FormFlow::new();
        form.toggle_value("Growth");
        form.toggle_value("Peace");
        form.toggle_value("Family");
        form.toggle_value("Success");

        assert_eq!(
            form.answers().values,
            vec!["Growth".to_owned(), "Peace".to_owned(), "Family".to_owned()]
        );

        // toggling an already-selected value still works
        form.toggle_value("Peace");
        assert_eq!(form.answers().values.len(), 2);
    }

    #[test]
    fn completing_the_form_yields_a_valid_submission() {
        let mut form = filled();
        assert_eq!(form.step(), Step::Privacy);

        form.answers_mut().is_private = true;

        let submission = form.submission().expect("build submission");
        assert!(submission.is_private);
        assert_eq!(submission.age, 21);
        assert!(submission.validate().is_ok());

        // state is intact until the caller resets after a successful write
        assert_eq!(form.step(), Step::Privacy);
        form.reset();
        assert_eq!(form.step(), Step::Reflection);
        assert!(form.answers().values.is_empty());
    }

    #[test]
    fn submission_is_unavailable_before_the_final_step() {
        let mut form = FormFlow::new();
        form.answers_mut().question1 = "x".into();

        assert!(form.submission().is_err());
    }
}
