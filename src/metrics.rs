//! Observability for query execution and relation loading.
//!
//! With the `metrics` feature, instruments are created on the global
//! OpenTelemetry meter; they stay no-ops until the application installs a
//! meter provider. With the `tracing` feature, [`tracing_helpers`] builds the
//! spans entered around each statement and relation load.

#[cfg(feature = "metrics")]
pub use instruments::{TideMetrics, METRICS};

#[cfg(feature = "metrics")]
mod instruments {
    use once_cell::sync::Lazy;
    use opentelemetry::{
        global,
        metrics::{Counter, Histogram},
        KeyValue,
    };
    use std::time::Duration;

    pub static METRICS: Lazy<TideMetrics> = Lazy::new(TideMetrics::init);

    pub struct TideMetrics {
        pub queries_total: Counter<u64>,
        pub query_errors_total: Counter<u64>,
        pub query_duration: Histogram<f64>,
        pub relation_loads_total: Counter<u64>,
        pub orphaned_rows_total: Counter<u64>,
    }

    impl TideMetrics {
        pub fn init() -> Self {
            let meter = global::meter("tidepool");

            let queries_total = meter
                .u64_counter("tidepool_queries_total")
                .with_description("Total statements executed")
                .build();

            let query_errors_total = meter
                .u64_counter("tidepool_query_errors_total")
                .with_description("Statements that returned an error")
                .build();

            let query_duration = meter
                .f64_histogram("tidepool_query_duration_seconds")
                .with_description("Duration of statements")
                .build();

            let relation_loads_total = meter
                .u64_counter("tidepool_relation_loads_total")
                .with_description("Relation sub-queries executed")
                .build();

            let orphaned_rows_total = meter
                .u64_counter("tidepool_orphaned_rows_total")
                .with_description("Related rows dropped because no origin instance matched")
                .build();

            Self {
                queries_total,
                query_errors_total,
                query_duration,
                relation_loads_total,
                orphaned_rows_total,
            }
        }

        pub fn record_query_duration(&self, elapsed: Duration) {
            self.queries_total.add(1, &[]);
            self.query_duration.record(elapsed.as_secs_f64(), &[]);
        }

        pub fn record_query_error(&self) {
            self.query_errors_total.add(1, &[]);
        }

        pub fn record_relation_load(&self, relation: &str) {
            self.relation_loads_total
                .add(1, &[KeyValue::new("relation", relation.to_string())]);
        }

        pub fn record_orphaned_rows(&self, relation: &str, count: u64) {
            if count > 0 {
                self.orphaned_rows_total
                    .add(count, &[KeyValue::new("relation", relation.to_string())]);
            }
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::Span;

    pub fn execute_query_span(sql: &str) -> Span {
        tracing::debug_span!("tidepool.query", db.statement = %sql)
    }

    pub fn load_relation_span(relation: &str, origins: usize) -> Span {
        tracing::debug_span!("tidepool.relation", relation = %relation, origins = origins)
    }

    pub fn acquire_connection_span() -> Span {
        tracing::debug_span!("tidepool.connect")
    }
}
