//! The query builder bound to a model.

use crate::error::TideError;
use crate::model::ModelHandle;
use crate::query::select::{Name, QueryOperations, QueryState};
use crate::relation::Relation;
use crate::value::Row;
use sea_query::{
    DeleteStatement, Expr, InsertStatement, PostgresQueryBuilder, QueryStatementWriter,
    SelectStatement, UpdateStatement, Values,
};
use std::fmt;
use std::sync::Arc;

/// What the main statement of a builder does.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operation {
    Select,
    Insert(Row),
    Update(Row),
    Delete,
}

pub(crate) enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

impl Statement {
    /// SQL with `$n` placeholders and the bound values.
    pub(crate) fn build(&self) -> (String, Values) {
        match self {
            Self::Select(stmt) => stmt.build(PostgresQueryBuilder),
            Self::Insert(stmt) => stmt.build(PostgresQueryBuilder),
            Self::Update(stmt) => stmt.build(PostgresQueryBuilder),
            Self::Delete(stmt) => stmt.build(PostgresQueryBuilder),
        }
    }

    /// SQL with values inlined.
    fn render(&self) -> String {
        match self {
            Self::Select(stmt) => stmt.to_string(PostgresQueryBuilder),
            Self::Insert(stmt) => stmt.to_string(PostgresQueryBuilder),
            Self::Update(stmt) => stmt.to_string(PostgresQueryBuilder),
            Self::Delete(stmt) => stmt.to_string(PostgresQueryBuilder),
        }
    }
}

/// A deferred query against one model's table, plus the relations to load
/// with it.
///
/// Builders are created with [`ModelHandle::query`] or
/// [`Instance::query`](crate::Instance::query), shaped with the
/// [`QueryOperations`] methods and consumed by
/// [`execute`](QueryBuilder::execute).
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    model: ModelHandle,
    state: QueryState,
    operation: Operation,
    relations: Vec<Arc<Relation>>,
}

impl QueryBuilder {
    pub fn new(model: ModelHandle) -> Self {
        Self {
            model,
            state: QueryState::new(),
            operation: Operation::Select,
            relations: Vec::new(),
        }
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    /// Relations that will be loaded with the main query, in inclusion order.
    pub fn relations(&self) -> &[Arc<Relation>] {
        &self.relations
    }

    pub(crate) fn operation(&self) -> &Operation {
        &self.operation
    }

    pub(crate) fn take_relations(&mut self) -> Vec<Arc<Relation>> {
        std::mem::take(&mut self.relations)
    }

    /// Turn the builder into an `INSERT ... RETURNING *` of `props`.
    pub fn insert(mut self, props: Row) -> Self {
        self.operation = Operation::Insert(props);
        self
    }

    /// Turn the builder into an `UPDATE` of `props`, restricted by the current filter.
    pub fn update(mut self, props: Row) -> Self {
        self.operation = Operation::Update(props);
        self
    }

    /// Turn the builder into a `DELETE`, restricted by the current filter.
    pub fn delete(mut self) -> Self {
        self.operation = Operation::Delete;
        self
    }

    /// Load relations declared by the model together with the main query.
    ///
    /// An empty `names` slice includes every declared relation. Including the
    /// same relation twice has no effect.
    ///
    /// # Errors
    ///
    /// `TideError::UnknownRelation` if the model declares no relation with one
    /// of the given names.
    pub fn with_related(mut self, names: &[&str]) -> Result<Self, TideError> {
        if names.is_empty() {
            let declared = self.model.relations().to_vec();
            for relation in declared {
                self = self.include(relation);
            }
            return Ok(self);
        }
        for name in names {
            let relation = self.model.relation(name)?;
            relation.assign_name(name);
            self = self.include(relation);
        }
        Ok(self)
    }

    /// Load `relation` together with the main query.
    ///
    /// The relation must have a name by the time results are paired.
    pub fn include(mut self, relation: Arc<Relation>) -> Self {
        if !self.relations.iter().any(|r| Arc::ptr_eq(r, &relation)) {
            self.relations.push(relation);
        }
        self
    }

    pub(crate) fn statement(&self) -> Result<Statement, TideError> {
        let table = self.model.table_name();
        let statement = match &self.operation {
            Operation::Select => Statement::Select(self.state.select_statement(table)),
            Operation::Insert(props) => {
                if props.is_empty() {
                    return Err(TideError::EmptyObject);
                }
                let mut stmt = InsertStatement::default();
                stmt.into_table(Name::new(table));
                stmt.columns(props.keys().map(|column| Name::new(column)));
                stmt.values(props.values().map(|value| Expr::val(value.clone())))
                    .map_err(|e| TideError::QueryError(e.to_string()))?;
                stmt.returning_all();
                Statement::Insert(stmt)
            }
            Operation::Update(props) => {
                if props.is_empty() {
                    return Err(TideError::EmptyObject);
                }
                let mut stmt = UpdateStatement::default();
                stmt.table(Name::new(table));
                for (column, value) in props {
                    stmt.value(Name::new(column), Expr::val(value.clone()));
                }
                if let Some(condition) = self.state.condition() {
                    stmt.cond_where(condition.clone());
                }
                Statement::Update(stmt)
            }
            Operation::Delete => {
                let mut stmt = DeleteStatement::default();
                stmt.from_table(Name::new(table));
                if let Some(condition) = self.state.condition() {
                    stmt.cond_where(condition.clone());
                }
                Statement::Delete(stmt)
            }
        };
        Ok(statement)
    }

    /// SQL of the main statement, values inlined.
    pub fn to_sql(&self) -> Result<String, TideError> {
        Ok(self.statement()?.render())
    }

    /// SQL of the main statement followed by one relation query per included
    /// relation, joined with `separator`.
    ///
    /// Relation queries are built without origin instances, so their filters
    /// show the placeholder value.
    pub fn to_sql_string(&self, separator: &str) -> Result<String, TideError> {
        let mut parts = vec![self.to_sql()?];
        for relation in &self.relations {
            parts.push(relation.create_query(&[])?.to_sql()?);
        }
        Ok(parts.join(separator))
    }
}

impl QueryOperations for QueryBuilder {
    fn query_state(&mut self) -> &mut QueryState {
        &mut self.state
    }
}

impl fmt::Display for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_sql_string(";\n") {
            Ok(sql) => f.write_str(&sql),
            Err(e) => write!(f, "<invalid query: {e}>"),
        }
    }
}
