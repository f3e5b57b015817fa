use tracing::{debug, info, warn};

use crate::{
    error::{Error, Result},
    sql::{
        executor::{Executor, ResultSet},
        parser::Parser,
    },
};

use super::{Context, Engine};

/// Transaction coordinator state
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionState {
    Idle,
    /// A transaction is open on `database`; mutations go to the pending log
    Open { database: String },
}

/// Deferred-log transaction coordinator
///
/// Mutating statements issued while a transaction is open are appended to
/// the pending log instead of executed. COMMIT replays the log in order
/// against the database captured at BEGIN and appends every applied line to
/// the audit log; ROLLBACK simply deletes the log.
#[derive(Debug)]
pub struct Transaction {
    state: TransactionState,
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl Transaction {
    pub fn new() -> Self {
        Self { state: TransactionState::Idle }
    }

    pub fn state(&self) -> &TransactionState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, TransactionState::Open { .. })
    }

    /// Opens a transaction on the active database with an empty pending log
    pub fn begin<E: Engine>(&mut self, engine: &mut E, ctx: &Context) -> Result<ResultSet> {
        if let TransactionState::Open { database } = &self.state {
            return Err(Error::TransactionState(format!(
                "a transaction is already open on {}",
                database
            )));
        }
        let database = ctx.must_database()?.to_string();
        engine.create_pending()?;
        info!("transaction started on {}", database);
        self.state = TransactionState::Open { database: database.clone() };
        Ok(ResultSet::Begin { database })
    }

    /// Records a syntax-checked statement line in the pending log
    pub fn defer<E: Engine>(&mut self, engine: &mut E, line: &str) -> Result<ResultSet> {
        if !self.is_open() {
            return Err(Error::TransactionState("no open transaction".to_string()));
        }
        engine.append_pending(line)?;
        let pending = engine.read_pending()?.len();
        debug!("deferred statement #{}", pending);
        Ok(ResultSet::Deferred { pending })
    }

    /// Replays the pending log and closes the transaction
    ///
    /// Lines that are not INSERT, UPDATE or DELETE, and lines whose execution
    /// fails validation, are skipped and reported. The pending log is always
    /// discarded and the coordinator is always back to idle afterwards.
    pub fn commit<E: Engine + 'static>(&mut self, engine: &mut E, ctx: &Context) -> Result<ResultSet> {
        let TransactionState::Open { database } = &self.state else {
            return Err(Error::TransactionState("no open transaction to commit".to_string()));
        };
        let replay_ctx = Context {
            database: Some(database.clone()),
            default_relation: ctx.default_relation.clone(),
        };
        self.state = TransactionState::Idle;

        let lines = match engine.read_pending() {
            Ok(lines) => lines,
            Err(err) => {
                engine.discard_pending()?;
                return Err(err);
            }
        };

        let mut applied = 0;
        let mut skipped = Vec::new();
        for line in lines.into_iter().filter(|l| !l.trim().is_empty()) {
            match replay(engine, &replay_ctx, &line) {
                Ok(()) => {
                    if let Err(err) = engine.append_audit(&line) {
                        engine.discard_pending()?;
                        return Err(err);
                    }
                    applied += 1;
                }
                Err(err @ Error::Internal(_)) => {
                    warn!("commit aborted at {:?}: {}", line, err);
                    engine.discard_pending()?;
                    return Err(err);
                }
                Err(err) => {
                    warn!("skipping pending statement {:?}: {}", line, err);
                    skipped.push((line, err));
                }
            }
        }

        engine.discard_pending()?;
        info!("transaction committed: {} applied, {} skipped", applied, skipped.len());
        Ok(ResultSet::Commit { applied, skipped })
    }

    /// Discards the pending log without applying anything
    pub fn rollback<E: Engine>(&mut self, engine: &mut E) -> Result<ResultSet> {
        if !self.is_open() {
            return Err(Error::TransactionState("no open transaction to roll back".to_string()));
        }
        self.state = TransactionState::Idle;
        let discarded = engine.read_pending().map(|lines| lines.len()).unwrap_or_default();
        engine.discard_pending()?;
        info!("transaction rolled back, {} statement(s) discarded", discarded);
        Ok(ResultSet::Rollback { discarded })
    }
}

/// Re-parses and executes one pending line
fn replay<E: Engine + 'static>(engine: &mut E, ctx: &Context, line: &str) -> Result<()> {
    let unknown = || Error::UnknownOperation(line.to_string());
    let kind = Parser::new(line).statement_kind().map_err(|_| unknown())?;
    if !kind.is_replayable() {
        return Err(unknown());
    }
    let stmt = Parser::new(line).parse().map_err(|_| unknown())?;
    let mut ctx = ctx.clone();
    <dyn Executor<E>>::build(stmt)?.execute(engine, &mut ctx)?;
    Ok(())
}
