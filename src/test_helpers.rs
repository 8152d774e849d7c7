//! Test utilities.
//!
//! [`MockExecutor`] records every statement it receives and answers queries
//! from canned row sets, so models and relations can be exercised without a
//! database.

use crate::error::TideError;
use crate::executor::TideExecutor;
use crate::value::Row;
use sea_query::{Value, Values};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A statement as the executor received it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedStatement {
    pub sql: String,
    pub values: Vec<Value>,
}

/// Executor double for tests.
///
/// Query results are looked up first among routes registered with
/// [`on_query`](Self::on_query), matched by substring of the SQL, then taken
/// in FIFO order from rows pushed with [`push_rows`](Self::push_rows). With
/// nothing queued, a query returns no rows.
#[derive(Default)]
pub struct MockExecutor {
    statements: Mutex<Vec<RecordedStatement>>,
    queued: Mutex<VecDeque<Vec<Row>>>,
    routes: Mutex<Vec<(String, VecDeque<Vec<Row>>)>>,
    affected: Mutex<VecDeque<u64>>,
    failures: Mutex<Vec<String>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a result set for the next unrouted query.
    pub fn push_rows(&self, rows: Vec<Row>) -> &Self {
        lock(&self.queued).push_back(rows);
        self
    }

    /// Queue a result set for the next query whose SQL contains `pattern`.
    ///
    /// Use routes when several queries run concurrently and their order is
    /// not deterministic.
    pub fn on_query(&self, pattern: &str, rows: Vec<Row>) -> &Self {
        let mut routes = lock(&self.routes);
        match routes.iter_mut().find(|(p, _)| p == pattern) {
            Some((_, queue)) => queue.push_back(rows),
            None => routes.push((pattern.to_string(), VecDeque::from([rows]))),
        }
        self
    }

    /// Queue the affected-row count returned by the next `execute`.
    pub fn push_affected(&self, count: u64) -> &Self {
        lock(&self.affected).push_back(count);
        self
    }

    /// Make every statement containing `pattern` fail.
    pub fn fail_on(&self, pattern: &str) -> &Self {
        lock(&self.failures).push(pattern.to_string());
        self
    }

    /// All statements received so far, in arrival order.
    pub fn statements(&self) -> Vec<RecordedStatement> {
        lock(&self.statements).clone()
    }

    /// SQL of all statements received so far.
    pub fn sql_log(&self) -> Vec<String> {
        lock(&self.statements).iter().map(|s| s.sql.clone()).collect()
    }

    fn record(&self, sql: &str, values: &Values) -> Result<(), TideError> {
        lock(&self.statements).push(RecordedStatement {
            sql: sql.to_string(),
            values: values.iter().cloned().collect(),
        });
        if lock(&self.failures).iter().any(|p| sql.contains(p.as_str())) {
            return Err(TideError::QueryError(format!("mock failure for: {sql}")));
        }
        Ok(())
    }
}

impl TideExecutor for MockExecutor {
    fn execute(&self, sql: &str, values: &Values) -> Result<u64, TideError> {
        self.record(sql, values)?;
        Ok(lock(&self.affected).pop_front().unwrap_or(0))
    }

    fn query_all(&self, sql: &str, values: &Values) -> Result<Vec<Row>, TideError> {
        self.record(sql, values)?;
        {
            let mut routes = lock(&self.routes);
            if let Some((_, queue)) = routes
                .iter_mut()
                .find(|(p, queue)| sql.contains(p.as_str()) && !queue.is_empty())
            {
                return Ok(queue.pop_front().unwrap_or_default());
            }
        }
        Ok(lock(&self.queued).pop_front().unwrap_or_default())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // a panicking test thread must not poison the double for others
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    #[test]
    fn test_mock_records_statements() {
        let mock = MockExecutor::new();
        mock.execute("DELETE FROM \"users\" WHERE \"id\" = $1", &Values(vec![1.into()]))
            .unwrap();
        let statements = mock.statements();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].values, vec![Value::Int(Some(1))]);
    }

    #[test]
    fn test_mock_routes_take_precedence() {
        let mock = MockExecutor::new();
        mock.push_rows(vec![row! { "id" => 1 }]);
        mock.on_query("\"employees\"", vec![row! { "id" => 10 }, row! { "id" => 11 }]);

        let employees = mock
            .query_all("SELECT * FROM \"employees\"", &Values(vec![]))
            .unwrap();
        assert_eq!(employees.len(), 2);

        let companies = mock
            .query_all("SELECT * FROM \"companies\"", &Values(vec![]))
            .unwrap();
        assert_eq!(companies.len(), 1);

        // EDGE CASE: exhausted route falls through to the FIFO queue, which is now empty
        let again = mock
            .query_all("SELECT * FROM \"employees\"", &Values(vec![]))
            .unwrap();
        assert!(again.is_empty());
    }

    #[test]
    fn test_mock_failures() {
        let mock = MockExecutor::new();
        mock.fail_on("\"broken\"");
        assert!(mock.query_all("SELECT * FROM \"broken\"", &Values(vec![])).is_err());
        assert_eq!(mock.sql_log().len(), 1);
    }

    #[test]
    fn test_mock_affected_counts() {
        let mock = MockExecutor::new();
        mock.push_affected(3);
        assert_eq!(mock.execute("UPDATE \"users\" SET \"a\" = $1", &Values(vec![])).unwrap(), 3);
        assert_eq!(mock.execute("UPDATE \"users\" SET \"a\" = $1", &Values(vec![])).unwrap(), 0);
    }
}
