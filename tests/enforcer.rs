//! Enforcer behavior against an in-memory engine

use async_trait::async_trait;
use readonly_sql_gate::{
    ApprovedQuery, AuditSink, ColumnDescription, DatabaseType, EngineValue, ExecutionEnforcer,
    GateError, QueryEngine, RawResultSet, Rejection, SqlValue, ViolationKind,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct RecordingEngine {
    calls: AtomicUsize,
    executed: Mutex<Vec<String>>,
    result: RawResultSet,
    fail_with: Option<String>,
    delay: Option<Duration>,
    dropped: Arc<AtomicBool>,
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl QueryEngine for RecordingEngine {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    async fn fetch_readonly(&self, query: ApprovedQuery) -> Result<RawResultSet, GateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.executed.lock().unwrap().push(query.sql().to_string());

        let _guard = DropFlag(self.dropped.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.fail_with {
            Some(message) => Err(GateError::Execution(message.clone())),
            None => Ok(self.result.clone()),
        }
    }

    async fn list_tables(&self) -> Result<Vec<String>, GateError> {
        Ok(vec![])
    }

    async fn describe_table(&self, _table: &str) -> Result<Vec<ColumnDescription>, GateError> {
        Ok(vec![])
    }
}

#[derive(Default)]
struct RecordingAudit {
    events: Mutex<Vec<String>>,
}

impl RecordingAudit {
    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl AuditSink for RecordingAudit {
    fn rejected(&self, sql: &str, rejection: &Rejection) {
        self.events
            .lock()
            .unwrap()
            .push(format!("rejected {} {}", rejection.kind(), sql));
    }

    fn accepted(&self, query: &ApprovedQuery) {
        self.events.lock().unwrap().push(format!("accepted {}", query.sql()));
    }

    fn execution_failed(&self, sql: &str, _error: &GateError) {
        self.events.lock().unwrap().push(format!("failed {sql}"));
    }

    fn cancelled(&self, sql: &str) {
        self.events.lock().unwrap().push(format!("cancelled {sql}"));
    }
}

fn users_result() -> RawResultSet {
    RawResultSet {
        columns: vec!["id".to_string(), "name".to_string()],
        rows: vec![
            vec![EngineValue::Int(1), EngineValue::Text("ada".to_string())],
            vec![EngineValue::Int(2), EngineValue::Null],
        ],
    }
}

fn enforcer(engine: Arc<RecordingEngine>, audit: Arc<RecordingAudit>) -> ExecutionEnforcer {
    ExecutionEnforcer::new(engine, audit)
}

#[tokio::test]
async fn test_rejected_query_never_reaches_engine() {
    let engine = Arc::new(RecordingEngine::default());
    let audit = Arc::new(RecordingAudit::default());
    let enforcer = enforcer(engine.clone(), audit.clone());

    for sql in [
        "DROP TABLE users",
        "SELECT * FROM users FOR UPDATE",
        "SELECT 1; DELETE FROM users",
        "SELECT nextval('seq')",
        "SELEC garbage",
    ] {
        let err = enforcer.execute_safely(sql).await.unwrap_err();
        assert!(err.is_security_violation(), "{sql}: {err}");
    }

    assert_eq!(engine.calls.load(Ordering::SeqCst), 0);
    let events = audit.events();
    assert_eq!(events.len(), 5);
    assert!(events.iter().all(|e| e.starts_with("rejected")));
}

#[tokio::test]
async fn test_rejection_message_names_violation() {
    let engine = Arc::new(RecordingEngine::default());
    let audit = Arc::new(RecordingAudit::default());
    let enforcer = enforcer(engine, audit.clone());

    let err = enforcer
        .execute_safely("SELECT * FROM accounts FOR SHARE")
        .await
        .unwrap_err();
    match &err {
        GateError::Security(rejection) => {
            assert_eq!(rejection.kind(), ViolationKind::LockingClausePresent)
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.caller_message().starts_with("Security violation"));
    assert_eq!(
        audit.events(),
        vec!["rejected LockingClausePresent SELECT * FROM accounts FOR SHARE"]
    );
}

#[tokio::test]
async fn test_exact_text_forwarded_to_engine() {
    let engine = Arc::new(RecordingEngine {
        result: users_result(),
        ..Default::default()
    });
    let audit = Arc::new(RecordingAudit::default());
    let enforcer = enforcer(engine.clone(), audit.clone());

    let sql = "select id, name\n  from users -- who\n";
    let result = enforcer.execute_safely(sql).await.unwrap();

    assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*engine.executed.lock().unwrap(), vec![sql.to_string()]);
    assert_eq!(audit.events(), vec![format!("accepted {sql}")]);

    assert_eq!(result.row_count(), 2);
    assert_eq!(result.columns(), ["id", "name"]);
    assert_eq!(result.rows()[0].get("name"), Some(&SqlValue::Text("ada".to_string())));
    assert!(result.rows()[1].get("name").is_some_and(SqlValue::is_null));
}

#[tokio::test]
async fn test_one_engine_call_per_acceptance() {
    let engine = Arc::new(RecordingEngine {
        result: users_result(),
        ..Default::default()
    });
    let audit = Arc::new(RecordingAudit::default());
    let enforcer = enforcer(engine.clone(), audit.clone());

    for _ in 0..3 {
        enforcer.execute_safely("SELECT id FROM users").await.unwrap();
    }

    assert_eq!(engine.calls.load(Ordering::SeqCst), 3);
    let accepted = audit.events().iter().filter(|e| e.starts_with("accepted")).count();
    assert_eq!(accepted, 3);
}

#[tokio::test]
async fn test_engine_takes_ownership_of_approval() {
    let engine = RecordingEngine {
        result: users_result(),
        ..Default::default()
    };
    let approved = readonly_sql_gate::validate("SELECT id FROM users", DatabaseType::Postgres)
        .into_result()
        .unwrap();

    let raw = engine.fetch_readonly(approved).await.unwrap();
    assert_eq!(raw.rows.len(), 2);
    assert_eq!(*engine.executed.lock().unwrap(), vec!["SELECT id FROM users".to_string()]);
}

#[tokio::test]
async fn test_row_cap_marks_truncation() {
    let engine = Arc::new(RecordingEngine {
        result: users_result(),
        ..Default::default()
    });
    let enforcer = enforcer(engine, Arc::new(RecordingAudit::default())).with_max_rows(Some(1));

    let result = enforcer.execute_safely("SELECT id, name FROM users").await.unwrap();
    assert_eq!(result.row_count(), 1);
    assert!(result.is_truncated());
    assert!(result.summary().contains("truncated"));
}

#[tokio::test]
async fn test_engine_failure_is_audited_and_returned() {
    let engine = Arc::new(RecordingEngine {
        fail_with: Some("relation \"missing\" does not exist".to_string()),
        ..Default::default()
    });
    let audit = Arc::new(RecordingAudit::default());
    let enforcer = enforcer(engine, audit.clone());

    let err = enforcer.execute_safely("SELECT * FROM missing").await.unwrap_err();
    assert!(!err.is_security_violation());
    assert!(err.caller_message().contains("does not exist"));
    assert_eq!(
        audit.events(),
        vec!["accepted SELECT * FROM missing", "failed SELECT * FROM missing"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_drops_in_flight_execution() {
    let dropped = Arc::new(AtomicBool::new(false));
    let engine = Arc::new(RecordingEngine {
        result: users_result(),
        delay: Some(Duration::from_secs(60)),
        dropped: dropped.clone(),
        ..Default::default()
    });
    let audit = Arc::new(RecordingAudit::default());
    let enforcer = enforcer(engine.clone(), audit.clone());

    let err = enforcer
        .execute_safely_until(
            "SELECT * FROM users",
            tokio::time::sleep(Duration::from_millis(10)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GateError::Cancelled));
    assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
    assert!(dropped.load(Ordering::SeqCst));
    assert_eq!(
        audit.events(),
        vec!["accepted SELECT * FROM users", "cancelled SELECT * FROM users"]
    );
}

#[tokio::test]
async fn test_concurrent_calls_are_independent() {
    let engine = Arc::new(RecordingEngine {
        result: users_result(),
        ..Default::default()
    });
    let enforcer = Arc::new(enforcer(engine.clone(), Arc::new(RecordingAudit::default())));

    let mut handles = Vec::new();
    for i in 0..8 {
        let enforcer = enforcer.clone();
        handles.push(tokio::spawn(async move {
            let sql = if i % 2 == 0 {
                "SELECT id FROM users"
            } else {
                "UPDATE users SET name = 'x'"
            };
            enforcer.execute_safely(sql).await.is_ok()
        }));
    }

    let mut ok = 0;
    for handle in handles {
        if handle.await.unwrap() {
            ok += 1;
        }
    }
    assert_eq!(ok, 4);
    assert_eq!(engine.calls.load(Ordering::SeqCst), 4);
}
