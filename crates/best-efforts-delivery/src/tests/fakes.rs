//! Scripted connection provider that counts every acquisition and release.

use bed_database::{
    ConnectionProvider, DatabaseError, DatabaseResult, DeliveryConnection, OwnedConnection,
    ParameterValue,
};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;

/// How the fake data source behaves.
#[derive(Debug, Clone)]
pub struct Behavior {
    /// What the pooled connection answers to the validation query.
    pub validation_result: Result<i64, String>,
    /// Borrowing from the pool fails.
    pub pooled_unavailable: bool,
    /// Opening a new connection fails.
    pub fresh_unavailable: bool,
    /// Closing a new connection reports an error.
    pub close_fails: bool,
    /// Outcome of each execution, in order.
    pub executions: Vec<Result<usize, String>>,
    /// Outcome once `executions` is used up.
    pub default_outcome: Result<usize, String>,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            validation_result: Ok(1),
            pooled_unavailable: false,
            fresh_unavailable: false,
            close_fails: false,
            executions: Vec::new(),
            default_outcome: Ok(1),
        }
    }
}

impl Behavior {
    /// Every execution fails.
    pub fn always_failing() -> Self {
        Self {
            default_outcome: Err("deadlock detected".to_string()),
            ..Self::default()
        }
    }

    /// The first `failures` executions fail, the rest succeed.
    pub fn succeeding_after(failures: usize) -> Self {
        Self {
            executions: (0..failures)
                .map(|i| Err(format!("lock wait timeout #{}", i + 1)))
                .collect(),
            ..Self::default()
        }
    }
}

/// One statement as it reached the fake driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Executed {
    pub data_source: String,
    pub sql: String,
    pub parameters: Vec<ParameterValue>,
    pub owned_connection: bool,
}

/// Counters, all starting at zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    pub pooled_acquired: usize,
    pub pooled_returned: usize,
    pub fresh_opened: usize,
    pub fresh_closed: usize,
    pub executed: Vec<Executed>,
}

impl Stats {
    pub fn executions(&self) -> usize {
        self.executed.len()
    }

    /// No connection of either kind was touched.
    pub fn untouched(&self) -> bool {
        self.pooled_acquired == 0 && self.fresh_opened == 0 && self.executed.is_empty()
    }
}

struct Shared {
    behavior: Behavior,
    script: Mutex<VecDeque<Result<usize, String>>>,
    stats: Mutex<Stats>,
}

impl Shared {
    fn execute(&self, data_source: &str, sql: &str, parameters: &[ParameterValue], owned: bool) -> DatabaseResult<usize> {
        self.stats.lock().executed.push(Executed {
            data_source: data_source.to_string(),
            sql: sql.to_string(),
            parameters: parameters.to_vec(),
            owned_connection: owned,
        });
        let outcome = self
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.behavior.default_outcome.clone());
        outcome.map_err(driver_error)
    }
}

fn driver_error(message: String) -> DatabaseError {
    DatabaseError::Io(io::Error::new(io::ErrorKind::Other, message))
}

#[derive(Clone)]
pub struct ScriptedProvider {
    shared: Arc<Shared>,
}

impl ScriptedProvider {
    pub fn new(behavior: Behavior) -> Self {
        let script = behavior.executions.iter().cloned().collect();
        Self {
            shared: Arc::new(Shared {
                behavior,
                script: Mutex::new(script),
                stats: Mutex::new(Stats::default()),
            }),
        }
    }

    pub fn stats(&self) -> Stats {
        self.shared.stats.lock().clone()
    }
}

pub struct FakePooled {
    shared: Arc<Shared>,
    data_source: String,
}

pub struct FakeFresh {
    shared: Arc<Shared>,
    data_source: String,
}

impl ConnectionProvider for ScriptedProvider {
    type Pooled = FakePooled;
    type Fresh = FakeFresh;

    fn pooled_connection(&self, data_source: &str) -> DatabaseResult<FakePooled> {
        if self.shared.behavior.pooled_unavailable {
            return Err(driver_error("pool exhausted".to_string()));
        }
        self.shared.stats.lock().pooled_acquired += 1;
        Ok(FakePooled {
            shared: Arc::clone(&self.shared),
            data_source: data_source.to_string(),
        })
    }

    fn new_connection(&self, data_source: &str) -> DatabaseResult<FakeFresh> {
        if self.shared.behavior.fresh_unavailable {
            return Err(driver_error("connection refused".to_string()));
        }
        self.shared.stats.lock().fresh_opened += 1;
        Ok(FakeFresh {
            shared: Arc::clone(&self.shared),
            data_source: data_source.to_string(),
        })
    }
}

impl DeliveryConnection for FakePooled {
    fn query_scalar(&self, _sql: &str) -> DatabaseResult<i64> {
        self.shared.behavior.validation_result.clone().map_err(driver_error)
    }

    fn execute_update(&self, sql: &str, parameters: &[ParameterValue]) -> DatabaseResult<usize> {
        self.shared.execute(&self.data_source, sql, parameters, false)
    }
}

impl Drop for FakePooled {
    fn drop(&mut self) {
        self.shared.stats.lock().pooled_returned += 1;
    }
}

impl DeliveryConnection for FakeFresh {
    fn query_scalar(&self, _sql: &str) -> DatabaseResult<i64> {
        Ok(1)
    }

    fn execute_update(&self, sql: &str, parameters: &[ParameterValue]) -> DatabaseResult<usize> {
        self.shared.execute(&self.data_source, sql, parameters, true)
    }
}

impl OwnedConnection for FakeFresh {
    fn close(self) -> DatabaseResult<()> {
        self.shared.stats.lock().fresh_closed += 1;
        if self.shared.behavior.close_fails {
            return Err(driver_error("close interrupted".to_string()));
        }
        Ok(())
    }
}
