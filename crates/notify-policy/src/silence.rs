//! Silences: time-boxed label matchers that suppress notifications.

use chrono::{DateTime, TimeDelta, Utc};
use notify_validation::{
    format_duration, matchers_match, parse_duration, Labels, Matcher, ValidationError,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{PolicyError, Result};

/// Duration of a new silence draft.
pub const DEFAULT_SILENCE_DURATION: &str = "2h";

/// A silence that suppresses alerts matching all of its matchers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Silence {
    /// Unique identifier for this silence.
    pub id: String,
    /// Label matchers; an alert must satisfy all of them.
    pub matchers: Vec<Matcher>,
    /// When the silence starts.
    pub starts_at: DateTime<Utc>,
    /// When the silence ends.
    pub ends_at: DateTime<Utc>,
    /// Who created the silence.
    pub created_by: String,
    /// Comment explaining the silence.
    pub comment: String,
}

impl Silence {
    /// Creates a new silence.
    ///
    /// # Errors
    ///
    /// Returns `PolicyError::InvalidSilence` if there are no matchers or
    /// `ends_at` is not after `starts_at`.
    pub fn new(
        matchers: Vec<Matcher>,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        created_by: impl Into<String>,
        comment: impl Into<String>,
    ) -> Result<Self> {
        if matchers.is_empty() {
            return Err(PolicyError::invalid_silence(
                "at least one matcher is required",
            ));
        }
        if ends_at <= starts_at {
            return Err(PolicyError::invalid_silence(
                "silence end time must be after start time",
            ));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            matchers,
            starts_at,
            ends_at,
            created_by: created_by.into(),
            comment: comment.into(),
        })
    }

    /// Checks if the silence is active at `instant`.
    #[must_use]
    pub fn is_active_at(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.starts_at && instant < self.ends_at
    }

    /// Checks if the silence is currently active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }

    /// Checks if a label set satisfies every matcher, regardless of time.
    #[must_use]
    pub fn matches(&self, labels: &Labels) -> bool {
        matchers_match(&self.matchers, labels)
    }

    /// Checks if the silence suppresses an alert with `labels` at `instant`.
    #[must_use]
    pub fn mutes(&self, labels: &Labels, instant: DateTime<Utc>) -> bool {
        self.is_active_at(instant) && self.matches(labels)
    }

    /// Returns the alert instances this silence would affect.
    pub fn affected_instances<'a>(
        &self,
        instances: impl IntoIterator<Item = &'a Labels>,
    ) -> Vec<&'a Labels> {
        instances
            .into_iter()
            .filter(|labels| self.matches(labels))
            .collect()
    }
}

/// The silence editor's state.
///
/// The duration text and the end time are two views of the same value:
/// editing one updates the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SilenceDraft {
    /// Start of the window.
    pub starts_at: DateTime<Utc>,
    /// End of the window.
    pub ends_at: DateTime<Utc>,
    /// Window length as duration text.
    pub duration: String,
    /// Matchers to silence.
    pub matchers: Vec<Matcher>,
    /// Author.
    pub created_by: String,
    /// Comment.
    pub comment: String,
}

impl SilenceDraft {
    /// A draft starting at `now` and lasting two hours.
    ///
    /// Near the end of the representable range the window is cut short at
    /// the latest instant and the duration text follows it.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        let draft = Self {
            starts_at: now,
            ends_at: now,
            duration: DEFAULT_SILENCE_DURATION.to_string(),
            matchers: Vec::new(),
            created_by: String::new(),
            comment: String::new(),
        };
        draft.with_length(TimeDelta::hours(2))
    }

    /// A draft prefilled from an existing silence, e.g. to recreate an
    /// expired one.
    #[must_use]
    pub fn from_silence(silence: &Silence) -> Self {
        Self {
            starts_at: silence.starts_at,
            ends_at: silence.ends_at,
            duration: window_text(silence.starts_at, silence.ends_at),
            matchers: silence.matchers.clone(),
            created_by: silence.created_by.clone(),
            comment: silence.comment.clone(),
        }
    }

    /// Sets the duration text and moves the end time to match.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDuration` if the text does not parse.
    pub fn with_duration(mut self, text: &str) -> std::result::Result<Self, ValidationError> {
        let millis = parse_duration(text).map_err(|e| e.with_field("duration"))?;
        let delta = i64::try_from(millis)
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .ok_or_else(|| ValidationError::invalid_duration("duration", text, "duration is too large"))?;
        let ends_at = self
            .starts_at
            .checked_add_signed(delta)
            .ok_or_else(|| ValidationError::invalid_duration("duration", text, "duration is too large"))?;

        self.ends_at = ends_at;
        self.duration = text.trim().to_string();
        Ok(self)
    }

    /// Sets the start time, keeping the duration and moving the end time.
    ///
    /// An end time past the latest representable instant is clamped to it.
    #[must_use]
    pub fn with_starts_at(mut self, starts_at: DateTime<Utc>) -> Self {
        let length = self.ends_at - self.starts_at;
        self.starts_at = starts_at;
        self.with_length(length)
    }

    fn with_length(mut self, length: TimeDelta) -> Self {
        match self.starts_at.checked_add_signed(length) {
            Some(ends_at) => self.ends_at = ends_at,
            None => {
                debug!(starts_at = %self.starts_at, "silence window clamped to the latest instant");
                self.ends_at = DateTime::<Utc>::MAX_UTC;
                self.duration = window_text(self.starts_at, self.ends_at);
            }
        }
        self
    }

    /// Sets the end time and recomputes the duration text.
    ///
    /// An end time at or before the start leaves the duration empty; the
    /// draft cannot be submitted until that is fixed.
    #[must_use]
    pub fn with_ends_at(mut self, ends_at: DateTime<Utc>) -> Self {
        self.ends_at = ends_at;
        self.duration = window_text(self.starts_at, ends_at);
        self
    }

    /// Sets the matchers.
    #[must_use]
    pub fn with_matchers(mut self, matchers: Vec<Matcher>) -> Self {
        self.matchers = matchers;
        self
    }

    /// Turns the draft into a silence.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSilence` for an empty matcher list or window.
    pub fn into_silence(self) -> Result<Silence> {
        let result = Silence::new(
            self.matchers,
            self.starts_at,
            self.ends_at,
            self.created_by,
            self.comment,
        );
        if let Err(e) = &result {
            debug!(error = %e, "rejected silence draft");
        }
        result
    }
}

fn window_text(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> String {
    let length = ends_at - starts_at;
    u64::try_from(length.num_milliseconds())
        .ok()
        .filter(|ms| *ms > 0)
        .map(format_duration)
        .unwrap_or_default()
}
