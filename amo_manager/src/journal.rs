use chrono::Utc;
use serde::Serialize;

use crate::{
    types::{Operation, StrategyEvent},
    utils::error::{AmoError, AmoResult},
};

/// Type of a journal entry
#[derive(Clone, Copy, Debug, Serialize, PartialEq, Eq)]
pub enum LogType {
    Info,
    /// Pool state, tilt, and solvency readings taken during a peg correction
    PegCorrection,
    /// Final outcome of an operation
    ExecutionResult,
    Governance,
}

/// Journal entry
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct JournalEntry {
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub entry: AmoResult<()>,
    pub log_type: LogType,
    pub note: Option<String>,
    /// Solidity signature and hex ABI data of an emitted event
    pub event: Option<(String, String)>,
}

impl JournalEntry {
    /// Creates a new entry, filling the `timestamp`, `entry` and `log_type` fields
    pub fn new(entry: AmoResult<()>, log_type: LogType) -> Self {
        Self {
            timestamp: Utc::now().timestamp_millis(),
            entry,
            log_type,
            note: None,
            event: None,
        }
    }

    /// Fills the `note` field of the entry
    pub fn note<S: AsRef<str>>(&mut self, text: S) -> &mut Self {
        self.note = Some(text.as_ref().to_string());
        self
    }

    /// Fills the `event` field of the entry
    pub fn event(&mut self, event: &StrategyEvent) -> &mut Self {
        self.event = Some((event.signature().to_string(), event.abi_data()));
        self
    }
}

/// All entries written during a single operation
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct JournalCollection {
    pub start_date_and_time: String,
    pub end_date_and_time: Option<String>,
    pub operation: Option<Operation>,
    pub entries: Vec<JournalEntry>,
}

impl JournalCollection {
    /// Opens a collection for the span of an operation
    pub fn open(operation: Option<Operation>) -> Self {
        Self {
            start_date_and_time: Utc::now().to_rfc3339(),
            end_date_and_time: None,
            operation,
            entries: vec![],
        }
    }

    /// Appends an entry with a note
    pub fn append_note<S: AsRef<str>>(
        &mut self,
        entry: AmoResult<()>,
        log_type: LogType,
        note: S,
    ) -> &mut Self {
        let mut journal_entry = JournalEntry::new(entry, log_type);
        journal_entry.note(note);
        self.entries.push(journal_entry);
        self
    }

    /// Appends an entry for an emitted event
    pub fn append_event(&mut self, event: &StrategyEvent) -> &mut Self {
        let mut journal_entry = JournalEntry::new(Ok(()), LogType::Info);
        journal_entry.event(event);
        self.entries.push(journal_entry);
        self
    }

    /// Records the outcome of the operation and stamps the closing time
    pub fn close(&mut self, outcome: Result<(), &AmoError>) -> &mut Self {
        let note = match outcome {
            Ok(()) => "Operation committed.".to_string(),
            Err(err) => format!("Operation reverted: {}", err),
        };
        self.append_note(
            outcome.map_err(|err| err.clone()),
            LogType::ExecutionResult,
            note,
        );
        self.end_date_and_time = Some(Utc::now().to_rfc3339());
        self
    }

    /// `true` when any entry carries an error
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|entry| entry.entry.is_err())
    }

    /// JSON export of the collection
    pub fn to_json(&self) -> AmoResult<String> {
        serde_json::to_string(self)
            .map_err(|err| AmoError::Config(format!("Journal export failed: {:#?}", err)))
    }
}

/// Keeps the newest `max` collections
pub fn prune_journal(journal: &mut Vec<JournalCollection>, max: usize) {
    if journal.len() > max {
        let excess = journal.len() - max;
        journal.drain(..excess);
    }
}
