//! Per-request orchestration: lex → parse → plan → (WAL begin) →
//! execute → (WAL commit/abort).
//!
//! [`Engine`] is the process-wide façade a network server or CLI holds
//! one of; [`Session`] is the per-connection state (which database
//! `USE DATABASE` selected) that a single client's statements share.
//! Every statement is its own implicit transaction — sessions never
//! span more than one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use joydb_core::ast::Statement;
use joydb_core::planner::{PlanNode, Planner};
use joydb_core::Parser;
use tracing::error;

use crate::error::{EngineError, Result};
use crate::executor::Executor;
use crate::observer::{notify, Observer, ObserverEvent};
use crate::registry::Registry;
use crate::result::ExecutionResult;

/// The process-wide engine façade: one [`Registry`] and the observers
/// watching every session's pipeline.
pub struct Engine {
    registry: Arc<Registry>,
    observers: RwLock<Vec<Arc<dyn Observer>>>,
    next_txid: AtomicU64,
}

impl Engine {
    #[must_use]
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            observers: RwLock::new(Vec::new()),
            next_txid: AtomicU64::new(1),
        }
    }

    /// Registers an observer to be notified of every session's
    /// lifecycle events from now on. A panicking observer is isolated
    /// and cannot affect execution.
    pub fn attach_observer(&self, observer: Arc<dyn Observer>) {
        self.observers.write().expect("observer lock poisoned").push(observer);
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Opens a new session with no database selected.
    #[must_use]
    pub fn session(&self) -> Session<'_> {
        Session {
            engine: self,
            current_database: None,
        }
    }

    fn notify(&self, event: &ObserverEvent) {
        let observers = self.observers.read().expect("observer lock poisoned");
        notify(&observers, event);
    }

    fn alloc_txid(&self) -> u64 {
        self.next_txid.fetch_add(1, Ordering::SeqCst)
    }
}

/// One client's run of statements. Each [`Session::execute`] call
/// allocates a fresh transaction id; `current_database` is the only
/// state a session carries across calls.
pub struct Session<'a> {
    engine: &'a Engine,
    current_database: Option<String>,
}

impl Session<'_> {
    #[must_use]
    pub fn current_database(&self) -> Option<&str> {
        self.current_database.as_deref()
    }

    /// Runs one SQL statement to completion.
    ///
    /// # Errors
    ///
    /// Propagates lex/parse/plan/constraint/WAL errors unchanged —
    /// nothing here is swallowed or downgraded to a generic failure.
    pub fn execute(&mut self, sql: &str) -> Result<ExecutionResult> {
        let txid = self.engine.alloc_txid();

        self.engine.notify(&ObserverEvent::LexStart {
            txid,
            timestamp: now_unix(),
            sql: sql.to_string(),
        });
        let token_count = joydb_core::Lexer::new(sql).tokenize().len();
        self.engine.notify(&ObserverEvent::LexEnd {
            txid,
            timestamp: now_unix(),
            token_count,
        });

        self.engine.notify(&ObserverEvent::ParseStart {
            txid,
            timestamp: now_unix(),
        });
        let statement = Parser::new(sql).parse_statement()?;
        self.engine.notify(&ObserverEvent::ParseEnd {
            txid,
            timestamp: now_unix(),
        });

        if statement.is_ddl() {
            return self.execute_ddl(statement);
        }

        self.execute_dml(txid, &statement)
    }

    fn execute_dml(&mut self, txid: u64, statement: &Statement) -> Result<ExecutionResult> {
        let database_name = self
            .current_database
            .clone()
            .ok_or(EngineError::NoDatabaseSelected)?;
        let loaded = self.engine.registry.load(&database_name)?;

        self.engine.notify(&ObserverEvent::PlanStart {
            txid,
            timestamp: now_unix(),
        });
        let plan = loaded.with_database(|database| Planner::plan(statement, database))?;
        self.engine.notify(&ObserverEvent::PlanEnd {
            txid,
            timestamp: now_unix(),
        });

        let is_mutating = matches!(
            plan,
            PlanNode::Insert { .. } | PlanNode::Update { .. } | PlanNode::Delete { .. }
        );

        if is_mutating {
            loaded.writer().begin(txid)?;
        }

        self.engine.notify(&ObserverEvent::ExecStart {
            txid,
            timestamp: now_unix(),
        });
        let outcome = loaded.with_database(|database| {
            let wal = is_mutating.then(|| (loaded.writer(), txid));
            Executor::new(database, wal).execute(&plan)
        });

        match outcome {
            Ok(result) => {
                if is_mutating {
                    loaded.writer().commit(txid)?;
                }
                self.engine.notify(&ObserverEvent::ExecEnd {
                    txid,
                    timestamp: now_unix(),
                    success: true,
                });
                Ok(result)
            }
            Err(err) => {
                if is_mutating {
                    if let Err(abort_err) = loaded.writer().abort(txid) {
                        error!(txid, error = %abort_err, "failed to log WAL abort for a failed statement");
                    }
                }
                self.engine.notify(&ObserverEvent::ExecEnd {
                    txid,
                    timestamp: now_unix(),
                    success: false,
                });
                Err(err)
            }
        }
    }

    fn execute_ddl(&mut self, statement: Statement) -> Result<ExecutionResult> {
        match statement {
            Statement::CreateDatabase(s) => {
                self.engine.registry.create(&s.name)?;
                Ok(ExecutionResult::Message(format!("database '{}' created", s.name)))
            }
            Statement::DropDatabase(s) => {
                self.engine.registry.drop_database(&s.name)?;
                if self.current_database.as_deref() == Some(s.name.as_str()) {
                    self.current_database = None;
                }
                Ok(ExecutionResult::Message(format!("database '{}' dropped", s.name)))
            }
            Statement::AlterDatabase(s) => {
                self.engine.registry.rename(&s.name, &s.new_name)?;
                if self.current_database.as_deref() == Some(s.name.as_str()) {
                    self.current_database = Some(s.new_name.clone());
                }
                Ok(ExecutionResult::Message(format!(
                    "database '{}' renamed to '{}'",
                    s.name, s.new_name
                )))
            }
            Statement::UseDatabase(s) => {
                self.engine.registry.load(&s.name)?;
                self.current_database = Some(s.name.clone());
                Ok(ExecutionResult::Message(format!("using database '{}'", s.name)))
            }
            Statement::Select(_) | Statement::Insert(_) | Statement::Update(_) | Statement::Delete(_) => {
                unreachable!("is_ddl() guards this dispatch")
            }
        }
    }
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use joydb_core::schema::{Column, ColumnType, Table};

    use super::*;
    use crate::registry::RegistryConfig;

    fn engine(dir: &std::path::Path) -> Engine {
        Engine::new(Arc::new(Registry::new(RegistryConfig {
            base_path: dir.to_path_buf(),
        })))
    }

    fn with_users_table(engine: &Engine, db_name: &str) {
        engine.registry().create(db_name).unwrap();
        let loaded = engine.registry().load(db_name).unwrap();
        loaded.with_database_mut(|db| {
            db.add_table(
                Table::new(
                    "users",
                    vec![
                        Column::new("id", ColumnType::Int).primary_key().auto_increment(),
                        Column::new("name", ColumnType::Text).not_null(),
                    ],
                )
                .unwrap(),
            );
        });
    }

    #[test]
    fn test_dml_without_selected_database_fails() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        let mut session = engine.session();
        assert!(matches!(
            session.execute("SELECT * FROM t"),
            Err(EngineError::NoDatabaseSelected)
        ));
    }

    #[test]
    fn test_use_database_then_insert_and_select() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        with_users_table(&engine, "shop");

        let mut session = engine.session();
        session.execute("USE DATABASE shop").unwrap();
        session.execute("INSERT INTO users (name) VALUES ('a')").unwrap();
        session.execute("INSERT INTO users (name) VALUES ('b')").unwrap();

        match session.execute("SELECT * FROM users WHERE id = 2").unwrap() {
            ExecutionResult::Rows { rows, .. } => {
                assert_eq!(rows.len(), 1);
                assert_eq!(
                    rows[0].get("name"),
                    Some(&joydb_core::schema::Value::Text("b".to_string()))
                );
            }
            other => panic!("expected Rows, got {other:?}"),
        }
    }

    #[test]
    fn test_failed_insert_does_not_advance_wal_commit() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        with_users_table(&engine, "shop");

        let mut session = engine.session();
        session.execute("USE DATABASE shop").unwrap();
        // Missing NOT NULL `name` fails the constraint check.
        assert!(session.execute("INSERT INTO users (id) VALUES (7)").is_err());

        let loaded = engine.registry().load("shop").unwrap();
        loaded.with_database(|db| assert_eq!(db.table("users").unwrap().row_count(), 0));
    }

    #[test]
    fn test_create_database_then_use_it() {
        let dir = tempfile::tempdir().unwrap();
        let engine = engine(dir.path());
        let mut session = engine.session();
        session.execute("CREATE DATABASE shop").unwrap();
        session.execute("USE DATABASE shop").unwrap();
        assert_eq!(session.current_database(), Some("shop"));
    }
}
