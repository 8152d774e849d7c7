//! Query shaping.
//!
//! [`QueryState`] accumulates the shape of a deferred query: its filter,
//! projection, joins, grouping, ordering and pagination. [`QueryOperations`]
//! is the closed set of shaping methods exposed on a
//! [`QueryBuilder`](crate::QueryBuilder). Table selection is not part of it;
//! the table always comes from the bound model.

use crate::value::Row;
use sea_query::{
    Asterisk, ColumnRef, Condition, Expr, ExprTrait, Iden, IntoColumnRef, IntoCondition, JoinType,
    Order, SelectStatement, Value,
};

/// Table or column name supplied at runtime.
#[derive(Debug, Clone)]
pub(crate) struct Name(String);

impl Name {
    pub(crate) fn new(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl Iden for Name {
    fn unquoted(&self) -> &str {
        &self.0
    }
}

/// `"column"` or, for `table.column`, `"table"."column"`.
pub(crate) fn column_ref(name: &str) -> ColumnRef {
    match name.split_once('.') {
        Some((table, column)) => (Name::new(table), Name::new(column)).into_column_ref(),
        None => Name::new(name).into_column_ref(),
    }
}

pub(crate) fn col(name: &str) -> Expr {
    Expr::col(column_ref(name))
}

/// The accumulated shape of a query.
#[derive(Debug, Clone)]
pub struct QueryState {
    select: SelectStatement,
    condition: Condition,
    has_condition: bool,
    columns: Vec<String>,
    single: bool,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            select: SelectStatement::default(),
            condition: Condition::all(),
            has_condition: false,
            columns: Vec::new(),
            single: false,
        }
    }
}

impl QueryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// AND `condition` onto the current filter.
    pub fn and_where(&mut self, condition: Condition) {
        self.condition = std::mem::replace(&mut self.condition, Condition::all()).add(condition);
        self.has_condition = true;
    }

    /// OR `condition` with the whole current filter.
    pub fn or_where(&mut self, condition: Condition) {
        if !self.has_condition {
            self.and_where(condition);
            return;
        }
        let current = std::mem::replace(&mut self.condition, Condition::all());
        self.condition = Condition::all().add(Condition::any().add(current).add(condition));
    }

    /// The accumulated filter, if any.
    pub fn condition(&self) -> Option<&Condition> {
        self.has_condition.then_some(&self.condition)
    }

    /// A single row was requested with `first()`.
    pub fn is_single(&self) -> bool {
        self.single
    }

    /// Selected columns; empty means `*`.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Render as a SELECT against `table`.
    pub fn select_statement(&self, table: &str) -> SelectStatement {
        let mut stmt = self.select.clone();
        stmt.from(Name::new(table));
        if self.columns.is_empty() {
            stmt.column(Asterisk);
        } else {
            stmt.columns(self.columns.iter().map(|c| column_ref(c)));
        }
        if let Some(condition) = self.condition() {
            stmt.cond_where(condition.clone());
        }
        stmt
    }
}

/// Query-shaping operations forwarded to the underlying statement.
///
/// Every method consumes and returns the builder so calls chain:
///
/// ```ignore
/// let rows = employees
///     .query()
///     .where_eq("company_id", 1)
///     .where_not_null("email")
///     .order_by("name", Order::Asc)
///     .limit(10)
///     .all()?;
/// ```
pub trait QueryOperations: Sized {
    /// The state the operations write to.
    fn query_state(&mut self) -> &mut QueryState;

    /// Add a filter condition (AND)
    ///
    /// Accepts anything convertible into a `Condition`: expressions built with
    /// `Expr`, or `Condition::all()` / `Condition::any()` groups.
    fn filter<F: IntoCondition>(mut self, condition: F) -> Self {
        self.query_state().and_where(condition.into_condition());
        self
    }

    /// OR a condition with everything filtered so far
    fn or_filter<F: IntoCondition>(mut self, condition: F) -> Self {
        self.query_state().or_where(condition.into_condition());
        self
    }

    /// `column = value`
    fn where_eq<V: Into<Value>>(self, column: &str, value: V) -> Self {
        self.filter(col(column).eq(value.into()))
    }

    /// `column = value` for every entry of `props`, conjunctively
    fn where_props(self, props: &Row) -> Self {
        let mut condition = Condition::all();
        for (column, value) in props {
            condition = condition.add(col(column).eq(value.clone()));
        }
        self.filter(condition)
    }

    /// `column IN (values...)`
    fn where_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.filter(col(column).is_in(values))
    }

    /// `column NOT IN (values...)`
    fn where_not_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.filter(col(column).is_not_in(values))
    }

    fn where_null(self, column: &str) -> Self {
        self.filter(col(column).is_null())
    }

    fn where_not_null(self, column: &str) -> Self {
        self.filter(col(column).is_not_null())
    }

    /// Raw SQL condition, inserted as is
    fn where_raw(self, sql: &str) -> Self {
        self.filter(Expr::cust(sql.to_string()))
    }

    /// Select only these columns instead of `*`
    fn columns(mut self, columns: &[&str]) -> Self {
        self.query_state().columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    fn distinct(mut self) -> Self {
        self.query_state().select.distinct();
        self
    }

    /// INNER JOIN `table` ON `on`
    fn join(mut self, table: &str, on: Expr) -> Self {
        self.query_state()
            .select
            .join(JoinType::InnerJoin, Name::new(table), on);
        self
    }

    /// LEFT JOIN `table` ON `on`
    fn left_join(mut self, table: &str, on: Expr) -> Self {
        self.query_state()
            .select
            .join(JoinType::LeftJoin, Name::new(table), on);
        self
    }

    fn group_by(mut self, column: &str) -> Self {
        self.query_state().select.group_by_col(column_ref(column));
        self
    }

    /// HAVING clause (for use with `group_by`)
    fn having(mut self, condition: Expr) -> Self {
        self.query_state().select.and_having(condition);
        self
    }

    fn order_by(mut self, column: &str, order: Order) -> Self {
        self.query_state().select.order_by(column_ref(column), order);
        self
    }

    fn limit(mut self, limit: u64) -> Self {
        self.query_state().select.limit(limit);
        self
    }

    fn offset(mut self, offset: u64) -> Self {
        self.query_state().select.offset(offset);
        self
    }

    /// Fetch a single row; the query then yields one instance or none.
    fn first(mut self) -> Self {
        let state = self.query_state();
        state.single = true;
        state.select.limit(1);
        self
    }
}

impl QueryOperations for QueryState {
    fn query_state(&mut self) -> &mut QueryState {
        self
    }
}
