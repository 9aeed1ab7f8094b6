//! Subject identities and the authorization context of one requester.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

const ISSUER_SEPARATOR: char = ':';

/// Issuer-qualified identity reference, e.g. `google:123`.
///
/// The textual form is split at the first `:`. Text without a separator has
/// an empty issuer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SubjectId {
    issuer: String,
    subject: String,
}

impl SubjectId {
    /// Create a subject id from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidSubjectId`] if `subject` is empty, the
    /// issuer contains the `:` separator, or the issuer is empty and the
    /// subject contains `:`, since the textual form could not be read back.
    pub fn new(issuer: impl Into<String>, subject: impl Into<String>) -> Result<Self, ModelError> {
        let issuer = issuer.into();
        let subject = subject.into();
        if let Err(reason) = validate(&issuer, &subject) {
            let text = if issuer.is_empty() {
                subject
            } else {
                format!("{issuer}{ISSUER_SEPARATOR}{subject}")
            };
            return Err(ModelError::subject_id(text, reason));
        }
        Ok(Self { issuer, subject })
    }

    /// Parse the `issuer:subject` textual form.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidSubjectId`] if the subject part is empty,
    /// or the issuer part is empty while the subject part holds another `:`.
    pub fn parse(value: &str) -> Result<Self, ModelError> {
        let (issuer, subject) = value.split_once(ISSUER_SEPARATOR).unwrap_or(("", value));
        validate(issuer, subject).map_err(|reason| ModelError::subject_id(value, reason))?;
        Ok(Self {
            issuer: issuer.to_owned(),
            subject: subject.to_owned(),
        })
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

fn validate(issuer: &str, subject: &str) -> Result<(), &'static str> {
    if subject.is_empty() {
        return Err("subject part is empty");
    }
    if issuer.contains(ISSUER_SEPARATOR) {
        return Err("issuer must not contain ':'");
    }
    if issuer.is_empty() && subject.contains(ISSUER_SEPARATOR) {
        return Err("subject without issuer must not contain ':'");
    }
    Ok(())
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.issuer.is_empty() {
            f.write_str(&self.subject)
        } else {
            write!(f, "{}{ISSUER_SEPARATOR}{}", self.issuer, self.subject)
        }
    }
}

impl FromStr for SubjectId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SubjectId {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SubjectId> for String {
    fn from(value: SubjectId) -> Self {
        value.to_string()
    }
}

/// All identities of one requester: the user plus e.g. its group memberships.
///
/// Never empty. Decisions are OR-combined across subjects, so order only
/// matters for diagnostics; it is preserved as given, duplicates removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SubjectId>", into = "Vec<SubjectId>")]
pub struct AuthorizationContext {
    subjects: Vec<SubjectId>,
}

impl AuthorizationContext {
    /// Create a context from the requester's subjects.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::EmptyAuthorizationContext`] if no subject is given.
    pub fn new(subjects: impl IntoIterator<Item = SubjectId>) -> Result<Self, ModelError> {
        let mut unique: Vec<SubjectId> = Vec::new();
        for subject in subjects {
            if !unique.contains(&subject) {
                unique.push(subject);
            }
        }
        if unique.is_empty() {
            return Err(ModelError::EmptyAuthorizationContext);
        }
        Ok(Self { subjects: unique })
    }

    /// Parse each textual subject id and build a context from them.
    ///
    /// # Errors
    ///
    /// Returns the first [`ModelError::InvalidSubjectId`] encountered, or
    /// [`ModelError::EmptyAuthorizationContext`] for an empty input.
    pub fn parse<I, S>(subjects: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = subjects
            .into_iter()
            .map(|s| SubjectId::parse(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(parsed)
    }

    #[must_use]
    pub fn single(subject: SubjectId) -> Self {
        Self {
            subjects: vec![subject],
        }
    }

    #[must_use]
    pub fn subjects(&self) -> &[SubjectId] {
        &self.subjects
    }

    /// The first subject, usually the authenticated user itself.
    #[must_use]
    pub fn primary(&self) -> &SubjectId {
        &self.subjects[0]
    }

    #[must_use]
    pub fn contains(&self, subject: &SubjectId) -> bool {
        self.subjects.contains(subject)
    }
}

impl TryFrom<Vec<SubjectId>> for AuthorizationContext {
    type Error = ModelError;

    fn try_from(value: Vec<SubjectId>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AuthorizationContext> for Vec<SubjectId> {
    fn from(value: AuthorizationContext) -> Self {
        value.subjects
    }
}

impl<'a> IntoIterator for &'a AuthorizationContext {
    type Item = &'a SubjectId;
    type IntoIter = std::slice::Iter<'a, SubjectId>;

    fn into_iter(self) -> Self::IntoIter {
        self.subjects.iter()
    }
}
