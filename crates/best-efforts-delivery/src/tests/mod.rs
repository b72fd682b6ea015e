//! End-to-end protocol tests.

pub mod fakes;

use crate::{
    DeliveryOutcome, ExecutionEvent, ExecutionEventRouter, ExecutionPhase, RouteOutcome,
    TransactionConfiguration, TransactionContext,
};
use bed_config_and_utils::StorageType;
use bed_database::{
    create_log_storage, ConnectionProvider, DeliveryConnection, MemoryTransactionLogStorage,
    ParameterValue, PoolConfig, SqliteDataSources, SqliteTransactionLogStorage,
    TransactionLogStorage,
};
use fakes::{Behavior, ScriptedProvider};
use std::sync::Arc;
use std::thread;
use tempfile::tempdir;

fn context(max_delivery_retries: u32, storage: StorageType) -> TransactionContext {
    let config = TransactionConfiguration::new(max_delivery_retries, storage).unwrap();
    TransactionContext::best_efforts("tx-e2e", config)
}

#[test]
fn failed_statement_delivered_on_second_attempt() {
    let storage = Arc::new(MemoryTransactionLogStorage::new());
    let provider = Arc::new(ScriptedProvider::new(Behavior::succeeding_after(1)));
    let router =
        ExecutionEventRouter::new(provider.clone()).with_storage(StorageType::Memory, storage.clone());
    let ctx = context(2, StorageType::Memory);

    let pre = ExecutionEvent::new(
        "7",
        ExecutionPhase::PreExecute,
        "ds_0",
        "UPDATE t_order SET status = ? WHERE order_id = ?",
        vec![ParameterValue::from("PAID"), ParameterValue::Integer(1000)],
    );
    assert_eq!(router.handle(&pre, Some(&ctx)).unwrap(), RouteOutcome::Logged);
    assert!(storage.find("7").unwrap().is_some());

    let outcome = router
        .handle(&pre.with_phase(ExecutionPhase::Failure), Some(&ctx))
        .unwrap();

    assert_eq!(
        outcome,
        RouteOutcome::Retried(DeliveryOutcome::Delivered { attempts: 2 })
    );
    assert!(storage.find("7").unwrap().is_none());
    assert_eq!(provider.stats().executions(), 2);
}

#[test]
fn entry_exists_only_until_confirmed() {
    let storage = Arc::new(MemoryTransactionLogStorage::new());
    let router = ExecutionEventRouter::new(Arc::new(ScriptedProvider::new(Behavior::always_failing())))
        .with_storage(StorageType::Memory, storage.clone());
    let ctx = context(2, StorageType::Memory);

    let ids: Vec<String> = (0..4).map(|i| format!("stmt-{}", i)).collect();
    for id in &ids {
        let event = ExecutionEvent::new(id.as_str(), ExecutionPhase::PreExecute, "ds_1", "DELETE FROM t_order_item", vec![]);
        router.handle(&event, Some(&ctx)).unwrap();
    }
    assert_eq!(storage.count().unwrap(), 4);

    // Even ids succeed, odd ids fail and exhaust their retries.
    for (i, id) in ids.iter().enumerate() {
        let phase = if i % 2 == 0 { ExecutionPhase::Success } else { ExecutionPhase::Failure };
        let event = ExecutionEvent::new(id.as_str(), phase, "ds_1", "DELETE FROM t_order_item", vec![]);
        router.handle(&event, Some(&ctx)).unwrap();
    }

    let pending: Vec<String> = storage.pending(10).unwrap().into_iter().map(|e| e.id).collect();
    assert_eq!(pending.len(), 2);
    assert!(pending.contains(&"stmt-1".to_string()));
    assert!(pending.contains(&"stmt-3".to_string()));
}

#[test]
fn concurrent_events_for_distinct_ids() {
    let storage = Arc::new(MemoryTransactionLogStorage::new());
    let provider = Arc::new(ScriptedProvider::new(Behavior::default()));
    let router = Arc::new(
        ExecutionEventRouter::new(provider.clone()).with_storage(StorageType::Memory, storage.clone()),
    );
    let ctx = Arc::new(context(3, StorageType::Memory));

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let router = Arc::clone(&router);
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                for n in 0..25 {
                    let event = ExecutionEvent::new(
                        format!("{}-{}", worker, n),
                        ExecutionPhase::PreExecute,
                        format!("ds_{}", worker % 2),
                        "INSERT INTO t_order (order_id) VALUES (?)",
                        vec![ParameterValue::Integer(n)],
                    );
                    router.handle(&event, Some(&ctx)).unwrap();
                    let next = if n % 5 == 0 { ExecutionPhase::Failure } else { ExecutionPhase::Success };
                    router.handle(&event.with_phase(next), Some(&ctx)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = provider.stats();
    assert_eq!(storage.count().unwrap(), 0);
    assert_eq!(stats.executions(), 8 * 5);
    assert_eq!(stats.pooled_acquired, stats.pooled_returned);
}

fn sqlite_fixture(dir: &std::path::Path) -> (Arc<SqliteTransactionLogStorage>, Arc<SqliteDataSources>) {
    let log = Arc::new(
        SqliteTransactionLogStorage::open(&dir.join("transaction_log.sqlite"), &PoolConfig::default())
            .unwrap(),
    );
    let mut sources = SqliteDataSources::new();
    sources
        .register("ds_0", &dir.join("ds_0.sqlite"), &PoolConfig::with_max_size(2))
        .unwrap();
    (log, Arc::new(sources))
}

#[test]
fn sqlite_statement_delivered_once_table_exists() {
    let dir = tempdir().unwrap();
    let (log, sources) = sqlite_fixture(dir.path());
    let router = ExecutionEventRouter::new(sources.clone()).with_storage(StorageType::Sqlite, log.clone());
    let ctx = context(3, StorageType::Sqlite);

    let event = ExecutionEvent::new(
        "7",
        ExecutionPhase::PreExecute,
        "ds_0",
        "INSERT INTO t_order (order_id, user_id, status) VALUES (?, ?, ?)",
        vec![
            ParameterValue::Integer(1000),
            ParameterValue::Integer(10),
            ParameterValue::from("INIT"),
        ],
    );
    router.handle(&event, Some(&ctx)).unwrap();

    // The original execution fails: the table is missing.
    {
        let conn = sources.pooled_connection("ds_0").unwrap();
        assert!(conn.execute_update(&event.sql, &event.parameters).is_err());
        conn.execute_update(
            "CREATE TABLE t_order (order_id INTEGER PRIMARY KEY, user_id INTEGER, status TEXT)",
            &[],
        )
        .unwrap();
    }

    let outcome = router
        .handle(&event.with_phase(ExecutionPhase::Failure), Some(&ctx))
        .unwrap();
    assert_eq!(
        outcome,
        RouteOutcome::Retried(DeliveryOutcome::Delivered { attempts: 1 })
    );
    assert_eq!(log.count().unwrap(), 0);

    let conn = sources.pooled_connection("ds_0").unwrap();
    assert_eq!(
        conn.query_scalar("SELECT user_id FROM t_order WHERE order_id = 1000").unwrap(),
        10
    );
}

#[test]
fn sqlite_undelivered_entry_survives_restart() {
    let dir = tempdir().unwrap();
    {
        let (log, sources) = sqlite_fixture(dir.path());
        let router = ExecutionEventRouter::new(sources).with_storage(StorageType::Sqlite, log);
        let ctx = context(2, StorageType::Sqlite);

        let event = ExecutionEvent::new(
            "7",
            ExecutionPhase::PreExecute,
            "ds_0",
            "UPDATE t_missing SET status = ? WHERE id = ?",
            vec![ParameterValue::from("PAID"), ParameterValue::Integer(1)],
        );
        router.handle(&event, Some(&ctx)).unwrap();
        let outcome = router
            .handle(&event.with_phase(ExecutionPhase::Failure), Some(&ctx))
            .unwrap();
        assert_eq!(
            outcome,
            RouteOutcome::Retried(DeliveryOutcome::Exhausted { attempts: 2 })
        );
    }

    let reopened = create_log_storage(
        StorageType::Sqlite,
        &dir.path().join("transaction_log.sqlite"),
        &PoolConfig::default(),
    )
    .unwrap();
    let entry = reopened.find("7").unwrap().unwrap();
    assert_eq!(entry.transaction_id, "tx-e2e");
    assert_eq!(entry.parameters[0], ParameterValue::from("PAID"));
}
