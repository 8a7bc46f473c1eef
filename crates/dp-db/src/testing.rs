//! Scripted backend for exercising orchestration without a spatial database.
//!
//! [`ScriptedDatabase`] records every call as an [`Event`], answers `fetch`
//! calls from responses registered against a substring of the statement, and
//! fails any statement containing a registered fault substring. Statements are
//! tracked per transaction so tests can tell committed work from rolled back
//! work.
//!
//! Failures follow PostgreSQL: once a statement fails, every later statement
//! in the transaction fails too, until `ROLLBACK TO SAVEPOINT` or a rollback.

use crate::error::{DbError, DbResult};
use crate::traits::Database;
use crate::value::Rows;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One recorded call
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Connect,
    Execute(String),
    Fetch(String),
    Commit,
    Rollback,
    Close,
}

/// Answers for fetches whose statement contains `needle`.
///
/// Answers are served in order; the last one repeats.
struct Response {
    needle: String,
    answers: VecDeque<Rows>,
}

#[derive(Default)]
struct ScriptState {
    events: Vec<Event>,
    connected: bool,
    pending: Vec<String>,
    committed: Vec<String>,
    rolled_back: Vec<String>,
    responses: Vec<Response>,
    faults: Vec<String>,
    fail_connect: bool,
    aborted: bool,
}

impl ScriptState {
    fn check_connected(&self) -> DbResult<()> {
        if self.connected {
            Ok(())
        } else {
            Err(DbError::NotConnected)
        }
    }

    fn check_fault(&mut self, sql: &str) -> DbResult<()> {
        if self.aborted {
            return Err(DbError::ExecutionError(format!(
                "current transaction is aborted, commands ignored until end of transaction block: {sql}"
            )));
        }
        match self.faults.iter().find(|f| sql.contains(f.as_str())) {
            Some(fault) => {
                let err = DbError::ExecutionError(format!("injected fault '{fault}': {sql}"));
                self.aborted = true;
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn answer(&mut self, sql: &str) -> Rows {
        match self
            .responses
            .iter_mut()
            .find(|r| sql.contains(r.needle.as_str()))
        {
            Some(response) if response.answers.len() > 1 => {
                response.answers.pop_front().unwrap_or_default()
            }
            Some(response) => response.answers.front().cloned().unwrap_or_default(),
            None => Vec::new(),
        }
    }
}

/// Recording, scriptable [`Database`] implementation
#[derive(Default)]
pub struct ScriptedDatabase {
    state: Mutex<ScriptState>,
}

impl ScriptedDatabase {
    /// Create an empty script: every fetch returns no rows, nothing fails
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `rows` as the next answer for fetches containing `needle`
    pub fn respond(&self, needle: &str, rows: Rows) -> &Self {
        let mut state = self.state();
        match state.responses.iter_mut().find(|r| r.needle == needle) {
            Some(response) => response.answers.push_back(rows),
            None => state.responses.push(Response {
                needle: needle.to_string(),
                answers: VecDeque::from([rows]),
            }),
        }
        self
    }

    /// Fail every execute or fetch whose statement contains `needle`
    pub fn fail_on(&self, needle: &str) -> &Self {
        self.state().faults.push(needle.to_string());
        self
    }

    /// Make `connect` fail
    pub fn fail_connect(&self) -> &Self {
        self.state().fail_connect = true;
        self
    }

    /// Every recorded call, in order
    pub fn events(&self) -> Vec<Event> {
        self.state().events.clone()
    }

    /// Every statement passed to `execute`, in order
    pub fn executed(&self) -> Vec<String> {
        self.state()
            .events
            .iter()
            .filter_map(|e| match e {
                Event::Execute(sql) => Some(sql.clone()),
                _ => None,
            })
            .collect()
    }

    /// Executed statements containing `needle`, in order
    pub fn executed_matching(&self, needle: &str) -> Vec<String> {
        self.executed()
            .into_iter()
            .filter(|sql| sql.contains(needle))
            .collect()
    }

    /// Statements that belonged to a committed transaction
    pub fn committed(&self) -> Vec<String> {
        self.state().committed.clone()
    }

    /// Statements that belonged to a rolled back transaction
    pub fn rolled_back(&self) -> Vec<String> {
        self.state().rolled_back.clone()
    }

    /// Whether a connection is currently open
    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    /// Number of recorded events equal to `event`
    pub fn count(&self, event: &Event) -> usize {
        self.state().events.iter().filter(|e| *e == event).count()
    }
}

#[async_trait]
impl Database for ScriptedDatabase {
    async fn connect(&self) -> DbResult<()> {
        let mut state = self.state();
        state.events.push(Event::Connect);
        if state.fail_connect {
            return Err(DbError::ConnectionError("injected connect fault".to_string()));
        }
        if state.connected {
            return Err(DbError::ConnectionError(
                "a connection is already open".to_string(),
            ));
        }
        state.connected = true;
        Ok(())
    }

    async fn execute(&self, sql: &str) -> DbResult<()> {
        let mut state = self.state();
        state.events.push(Event::Execute(sql.to_string()));
        state.check_connected()?;
        if sql.starts_with("ROLLBACK TO SAVEPOINT") {
            state.aborted = false;
        }
        state.check_fault(sql)?;
        state.pending.push(sql.to_string());
        Ok(())
    }

    async fn fetch(&self, sql: &str) -> DbResult<Rows> {
        let mut state = self.state();
        state.events.push(Event::Fetch(sql.to_string()));
        state.check_connected()?;
        state.check_fault(sql)?;
        Ok(state.answer(sql))
    }

    async fn commit(&self) -> DbResult<()> {
        let mut state = self.state();
        state.events.push(Event::Commit);
        state.check_connected()?;
        if state.aborted {
            state.aborted = false;
            let pending = std::mem::take(&mut state.pending);
            state.rolled_back.extend(pending);
            return Err(DbError::TransactionError(
                "COMMIT failed: transaction was aborted and has been rolled back".to_string(),
            ));
        }
        state.check_fault("COMMIT")?;
        let pending = std::mem::take(&mut state.pending);
        state.committed.extend(pending);
        Ok(())
    }

    async fn rollback(&self) -> DbResult<()> {
        let mut state = self.state();
        state.events.push(Event::Rollback);
        state.check_connected()?;
        state.aborted = false;
        let pending = std::mem::take(&mut state.pending);
        state.rolled_back.extend(pending);
        Ok(())
    }

    async fn close(&self) -> DbResult<()> {
        let mut state = self.state();
        state.events.push(Event::Close);
        state.aborted = false;
        let pending = std::mem::take(&mut state.pending);
        state.rolled_back.extend(pending);
        state.connected = false;
        Ok(())
    }

    fn supports_savepoints(&self) -> bool {
        true
    }

    fn db_type(&self) -> &'static str {
        "scripted"
    }
}
