#![allow(missing_docs)]

//! Apply one field change across a selection of trains.

use std::{
    cell::Cell,
    fmt,
    panic::{self, AssertUnwindSafe},
    str::FromStr,
};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::{error::UpdateError, models::Train};

static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("failed to compile time regex"));

/// Fields a batch edit can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditableField {
    Operator,
    From,
    To,
    ArrivalTime,
    Track,
    Otn,
    Notes,
    AnnouncedTrainNumber,
    Completed,
    NewTime,
    NewTrack,
    NewOperator,
    NewNotes,
}

impl EditableField {
    /// Every editable field, in the order the batch dialog lists them.
    pub const ALL: [EditableField; 13] = [
        EditableField::Track,
        EditableField::ArrivalTime,
        EditableField::Operator,
        EditableField::Notes,
        EditableField::Completed,
        EditableField::NewTime,
        EditableField::NewTrack,
        EditableField::NewOperator,
        EditableField::NewNotes,
        EditableField::From,
        EditableField::To,
        EditableField::Otn,
        EditableField::AnnouncedTrainNumber,
    ];

    /// Wire name of the field.
    pub fn name(self) -> &'static str {
        match self {
            EditableField::Operator => "operator",
            EditableField::From => "from",
            EditableField::To => "to",
            EditableField::ArrivalTime => "arrivalTime",
            EditableField::Track => "track",
            EditableField::Otn => "otn",
            EditableField::Notes => "notes",
            EditableField::AnnouncedTrainNumber => "announcedTrainNumber",
            EditableField::Completed => "completed",
            EditableField::NewTime => "newTime",
            EditableField::NewTrack => "newTrack",
            EditableField::NewOperator => "newOperator",
            EditableField::NewNotes => "newNotes",
        }
    }

    /// Check `value` without applying it.
    ///
    /// Times must be blank or `HH:MM`; `completed` must read as a boolean.
    pub fn validate(self, value: &str) -> Result<(), UpdateError> {
        let trimmed = value.trim();
        match self {
            EditableField::ArrivalTime | EditableField::NewTime => {
                if trimmed.is_empty() || TIME_RE.is_match(trimmed) {
                    Ok(())
                } else {
                    Err(self.invalid(value, "expected HH:MM"))
                }
            }
            EditableField::Completed => parse_flag(trimmed)
                .map(|_| ())
                .ok_or_else(|| self.invalid(value, "expected true or false")),
            EditableField::Operator if trimmed.is_empty() => {
                Err(self.invalid(value, "operator is required"))
            }
            _ => Ok(()),
        }
    }

    /// Validate and write `value` into `train`. A blank value clears
    /// optional fields.
    pub fn apply(self, train: &mut Train, value: &str) -> Result<(), UpdateError> {
        self.validate(value)?;
        let trimmed = value.trim();
        let optional = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        match self {
            EditableField::Operator => train.operator = trimmed.to_string(),
            EditableField::From => train.from = optional,
            EditableField::To => train.to = optional,
            EditableField::ArrivalTime => train.arrival_time = optional,
            EditableField::Track => train.track = optional,
            EditableField::Otn => train.otn = optional,
            EditableField::Notes => train.notes = optional,
            EditableField::AnnouncedTrainNumber => train.announced_train_number = optional,
            EditableField::Completed => train.completed = parse_flag(trimmed).unwrap_or(false),
            EditableField::NewTime => train.new_time = optional,
            EditableField::NewTrack => train.new_track = optional,
            EditableField::NewOperator => train.new_operator = optional,
            EditableField::NewNotes => train.new_notes = optional,
        }
        Ok(())
    }

    fn invalid(self, value: &str, reason: &str) -> UpdateError {
        UpdateError::InvalidValue {
            field: self.name(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for EditableField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EditableField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        EditableField::ALL
            .into_iter()
            .find(|field| field.name().eq_ignore_ascii_case(needle))
            .ok_or_else(|| format!("field '{s}' cannot be batch edited"))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "done" | "completed" => Some(true),
        "false" | "no" | "0" | "pending" => Some(false),
        _ => None,
    }
}

/// Result of updating one selected id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Updated,
    /// The id was selected but is no longer in the collection.
    Skipped,
    Failed(UpdateError),
}

/// Per-id outcomes of a batch, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub outcomes: Vec<(String, BatchOutcome)>,
}

impl BatchReport {
    pub fn updated(&self) -> usize {
        self.count(|outcome| matches!(outcome, BatchOutcome::Updated))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, BatchOutcome::Skipped))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, BatchOutcome::Failed(_)))
    }

    /// `true` when nothing failed. Skipped ids do not count as failures.
    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }

    /// Failures with their ids.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &UpdateError)> {
        self.outcomes.iter().filter_map(|(id, outcome)| match outcome {
            BatchOutcome::Failed(err) => Some((id.as_str(), err)),
            _ => None,
        })
    }

    /// One-line summary for status bars.
    pub fn summary(&self) -> String {
        let mut message = format!("Updated {} train(s)", self.updated());
        if self.skipped() > 0 {
            message.push_str(&format!(", skipped {}", self.skipped()));
        }
        if self.failed() > 0 {
            message.push_str(&format!(", {} failed", self.failed()));
        }
        message
    }

    fn count(&self, predicate: impl Fn(&BatchOutcome) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| predicate(outcome))
            .count()
    }
}

/// Write `field = value` into every train whose id is in `selected`.
///
/// Records are looked up in `all`, never in a filtered view, so a selection
/// survives filter changes. Unknown ids are skipped. Each call to `updater`
/// is isolated: an error or a panic is recorded for that id and the loop
/// carries on with the next one.
pub fn batch_update<F>(
    all: &[Train],
    selected: &[String],
    field: EditableField,
    value: &str,
    mut updater: F,
) -> BatchReport
where
    F: FnMut(Train) -> Result<(), UpdateError>,
{
    let mut report = BatchReport::default();
    for id in selected {
        let Some(current) = all.iter().find(|train| &train.id == id) else {
            report.outcomes.push((id.clone(), BatchOutcome::Skipped));
            continue;
        };

        let mut updated = current.clone();
        let outcome = match field.apply(&mut updated, value) {
            Err(err) => BatchOutcome::Failed(err),
            Ok(()) => {
                let _scope = UpdaterScope::enter();
                match panic::catch_unwind(AssertUnwindSafe(|| updater(updated))) {
                    Ok(Ok(())) => BatchOutcome::Updated,
                    Ok(Err(err)) => BatchOutcome::Failed(err),
                    Err(payload) => {
                        BatchOutcome::Failed(UpdateError::Panicked(panic_message(payload)))
                    }
                }
            }
        };

        if let BatchOutcome::Failed(err) = &outcome {
            warn!(train = %id, field = %field, %err, "Batch update failed for train");
        }
        report.outcomes.push((id.clone(), outcome));
    }

    info!(
        field = %field,
        selected = selected.len(),
        updated = report.updated(),
        skipped = report.skipped(),
        failed = report.failed(),
        "Batch update finished"
    );
    report
}

thread_local! {
    static IN_UPDATER: Cell<bool> = Cell::new(false);
}

// Chains onto whatever hook was installed first. Panics raised inside an
// updater go to the log instead of stderr, which the dashboard owns.
static QUIET_UPDATER_HOOK: Lazy<()> = Lazy::new(|| {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if IN_UPDATER.with(Cell::get) {
            debug!(%info, "Updater panicked");
        } else {
            previous(info);
        }
    }));
});

/// Marks the current thread as running an updater until dropped.
struct UpdaterScope;

impl UpdaterScope {
    fn enter() -> Self {
        Lazy::force(&QUIET_UPDATER_HOOK);
        IN_UPDATER.with(|flag| flag.set(true));
        Self
    }
}

impl Drop for UpdaterScope {
    fn drop(&mut self) {
        IN_UPDATER.with(|flag| flag.set(false));
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
