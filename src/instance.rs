//! Model instances.
//!
//! An [`Instance`] is one row of a model's table: its current props, whether
//! it was created in memory or fetched, a snapshot of the values last read
//! from or written to the database, and the related results paired onto it.
//!
//! The snapshot drives dirty tracking. Saving a fetched instance writes only
//! the props that differ from the snapshot; saving an unchanged one issues no
//! statement at all.

use crate::error::TideError;
use crate::model::ModelHandle;
use crate::query::select::col;
use crate::query::{QueryBuilder, QueryOperations};
use crate::relation::Related;
use crate::utils::KeyCase;
use crate::value::{is_null, to_json, values_match, Row};
use sea_query::{Condition, ExprTrait, Value};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// What [`Instance::save`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Nothing changed since the last read or write; no statement was issued
    Unchanged,
    /// The instance was inserted; holds the row returned by the database
    Inserted(Instance),
    /// The changed props were written; holds the affected row count
    Updated(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    model: ModelHandle,
    props: Row,
    is_new: bool,
    old_props: Row,
    related: BTreeMap<String, Related>,
    key_case: KeyCase,
}

impl Instance {
    pub(crate) fn new(model: ModelHandle, props: Row) -> Self {
        Self {
            model,
            props,
            is_new: true,
            old_props: Row::new(),
            related: BTreeMap::new(),
            key_case: KeyCase::Column,
        }
    }

    pub(crate) fn persisted(model: ModelHandle, row: Row) -> Self {
        Self {
            model,
            old_props: row.clone(),
            props: row,
            is_new: false,
            related: BTreeMap::new(),
            key_case: KeyCase::Column,
        }
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    /// `true` if the instance was created in memory rather than read from the database.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Read from the database, or a new instance that was inserted since.
    fn is_stored(&self) -> bool {
        !self.is_new || !self.old_props.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.props.insert(key.to_string(), value.into());
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.props.remove(key)
    }

    pub fn props(&self) -> &Row {
        &self.props
    }

    /// Values as last read from or written to the database.
    pub fn old_props(&self) -> &Row {
        &self.old_props
    }

    pub fn related(&self, name: &str) -> Option<&Related> {
        self.related.get(name)
    }

    /// The instance paired under a one-to-one or many-to-one relation.
    pub fn related_one(&self, name: &str) -> Option<&Instance> {
        self.related.get(name).and_then(Related::as_one)
    }

    /// Instances paired under `name`; empty when nothing was paired.
    pub fn related_many(&self, name: &str) -> &[Instance] {
        self.related.get(name).map(Related::as_slice).unwrap_or(&[])
    }

    pub fn related_map(&self) -> &BTreeMap<String, Related> {
        &self.related
    }

    pub(crate) fn related_map_mut(&mut self) -> &mut BTreeMap<String, Related> {
        &mut self.related
    }

    fn is_savable(&self, key: &str) -> bool {
        let model = self.model.model();
        if model.blacklisted_props().contains(&key) {
            return false;
        }
        let whitelist = model.whitelisted_props();
        whitelist.is_empty() || whitelist.contains(&key)
    }

    /// Savable props whose value differs from the snapshot or has none.
    pub fn changed_props(&self) -> Row {
        self.props
            .iter()
            .filter(|(key, _)| self.is_savable(key))
            .filter(|(key, value)| match self.old_props.get(key.as_str()) {
                Some(old) => old != *value && !values_match(old, value),
                None => true,
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Filter matching this instance's row on every primary-key column.
    ///
    /// Snapshot values are preferred so a changed key still addresses the
    /// stored row.
    ///
    /// # Errors
    ///
    /// `TideError::InexistentObject` when the model has no key column or a key
    /// column has no value.
    pub fn key_condition(&self) -> Result<Condition, TideError> {
        if self.model.primary_key().arity() == 0 {
            return Err(TideError::InexistentObject);
        }
        let mut condition = Condition::all();
        for column in self.model.primary_key().iter() {
            let value = self
                .old_props
                .get(column)
                .or_else(|| self.props.get(column))
                .filter(|value| !is_null(value))
                .ok_or(TideError::InexistentObject)?;
            condition = condition.add(col(column).eq(value.clone()));
        }
        Ok(condition)
    }

    fn ensure_persisted(&self) -> Result<(), TideError> {
        if !self.is_stored() {
            return Err(TideError::InexistentObject);
        }
        Ok(())
    }

    /// Single-row query selecting this instance.
    pub fn query(&self) -> Result<QueryBuilder, TideError> {
        self.ensure_persisted()?;
        Ok(self.model.query().filter(self.key_condition()?).first())
    }

    /// The statement [`save`](Self::save) would run, `None` if there is nothing to write.
    ///
    /// # Errors
    ///
    /// - `TideError::EmptyObject` for a new instance without savable props
    /// - `TideError::InexistentObject` for a persisted instance missing a key value
    pub fn save_query(&self) -> Result<Option<QueryBuilder>, TideError> {
        let changed = self.changed_props();
        if changed.is_empty() {
            return if self.is_stored() {
                Ok(None)
            } else {
                Err(TideError::EmptyObject)
            };
        }
        let query = if !self.is_stored() {
            self.model.query().insert(changed)
        } else {
            self.model
                .query()
                .filter(self.key_condition()?)
                .update(changed)
        };
        Ok(Some(query))
    }

    /// Validate, then write the changed props.
    ///
    /// A new instance is inserted and the stored row is returned as a
    /// persisted instance. `self` stays new, but its snapshot takes the stored
    /// row, so later saves update that row instead of inserting again. A
    /// persisted instance is updated and its snapshot advanced. Either way the
    /// snapshot only moves once the write succeeded.
    pub fn save(&mut self) -> Result<SaveOutcome, TideError> {
        self.model.model().validate(self)?;

        let Some(query) = self.save_query()? else {
            log::debug!("{}: nothing to save", self.model.name());
            return Ok(SaveOutcome::Unchanged);
        };

        if !self.is_stored() {
            let stored = query.execute()?.into_one();
            let stored = stored.unwrap_or_else(|| self.model.from_row(self.changed_props()));
            self.old_props.extend(stored.props().clone());
            return Ok(SaveOutcome::Inserted(stored));
        }

        let changed = self.changed_props();
        let affected = query.execute()?.affected();
        self.old_props.extend(changed);
        Ok(SaveOutcome::Updated(affected))
    }

    pub fn delete_query(&self) -> Result<QueryBuilder, TideError> {
        self.ensure_persisted()?;
        Ok(self.model.query().filter(self.key_condition()?).delete())
    }

    /// Validate, then delete the stored row. Returns the affected row count.
    pub fn del(&self) -> Result<u64, TideError> {
        self.model.model().validate(self)?;
        Ok(self.delete_query()?.execute()?.affected())
    }

    /// Single-row query for this instance loading the named relations.
    ///
    /// An empty `names` slice loads every declared relation.
    pub fn fetch_related(&self, names: &[&str]) -> Result<QueryBuilder, TideError> {
        self.query()?.with_related(names)
    }

    /// Case of prop keys in serialized output.
    pub fn key_case(&self) -> KeyCase {
        self.key_case
    }

    /// Serialize prop keys in `case`, here and in every related instance.
    /// Relation names are kept as declared.
    pub(crate) fn set_key_case(&mut self, case: KeyCase) {
        self.key_case = case;
        for related in self.related.values_mut() {
            for instance in related.instances_mut() {
                instance.set_key_case(case);
            }
        }
    }

    /// Props and related results as a JSON object.
    pub fn to_json(&self) -> JsonValue {
        let mut object: serde_json::Map<String, JsonValue> = self
            .props
            .iter()
            .map(|(key, value)| (self.key_case.apply(key), to_json(value)))
            .collect();
        for (name, related) in &self.related {
            let value = match related {
                Related::One(instance) => instance.to_json(),
                Related::Many(instances) => {
                    JsonValue::Array(instances.iter().map(Instance::to_json).collect())
                }
            };
            object.insert(name.clone(), value);
        }
        JsonValue::Object(object)
    }
}

impl Serialize for Instance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.props.len() + self.related.len()))?;
        for (key, value) in &self.props {
            map.serialize_entry(&self.key_case.apply(key), &to_json(value))?;
        }
        for (name, related) in &self.related {
            match related {
                Related::One(instance) => map.serialize_entry(name, instance.as_ref())?,
                Related::Many(instances) => map.serialize_entry(name, instances)?,
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use crate::relation::Identity;
    use crate::row;
    use crate::test_helpers::MockExecutor;
    use crate::Database;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    struct Company;

    impl Model for Company {
        fn name(&self) -> &str {
            "Company"
        }
    }

    struct Account;

    impl Model for Account {
        fn name(&self) -> &str {
            "Account"
        }

        fn blacklisted_props(&self) -> &[&str] {
            &["password_confirmation"]
        }

        fn validate(&self, instance: &Instance) -> Result<(), TideError> {
            match instance.get("email") {
                Some(email) if !is_null(email) => Ok(()),
                _ => Err(TideError::Validation(vec!["email is required".to_string()])),
            }
        }
    }

    struct Membership;

    impl Model for Membership {
        fn name(&self) -> &str {
            "Membership"
        }

        fn primary_key(&self) -> Identity {
            Identity::from(vec!["company_id", "employee_id"])
        }

        fn whitelisted_props(&self) -> &[&str] {
            &["role"]
        }
    }

    struct AuditEntry;

    impl Model for AuditEntry {
        fn name(&self) -> &str {
            "AuditEntry"
        }

        fn primary_key(&self) -> Identity {
            Identity::Many(Vec::new())
        }
    }

    fn setup() -> (Arc<MockExecutor>, Database) {
        let mock = Arc::new(MockExecutor::new());
        let db = Database::new(mock.clone());
        db.register(Company).unwrap();
        db.register(Account).unwrap();
        db.register(Membership).unwrap();
        db.register(AuditEntry).unwrap();
        (mock, db)
    }

    #[test]
    fn test_new_instance_has_empty_snapshot() {
        let (_mock, db) = setup();
        let company = db.model("Company").unwrap().instance(row! { "name" => "Acme" });
        assert!(company.is_new());
        assert!(company.old_props().is_empty());
        assert_eq!(company.changed_props(), row! { "name" => "Acme" });
    }

    #[test]
    fn test_fetched_instance_is_clean() {
        let (_mock, db) = setup();
        let company = db
            .model("Company")
            .unwrap()
            .from_row(row! { "id" => 1, "name" => "Acme" });
        assert!(company.changed_props().is_empty());
    }

    #[test]
    fn test_changed_props_only_lists_differences() {
        let (_mock, db) = setup();
        let mut company = db
            .model("Company")
            .unwrap()
            .from_row(row! { "id" => 1, "name" => "Acme", "size" => 10 });
        company.set("name", "Acme Corp").set("city", "Oslo");
        // EDGE CASE: same number, different integer width
        company.set("size", 10i64);
        assert_eq!(
            company.changed_props(),
            row! { "city" => "Oslo", "name" => "Acme Corp" }
        );
    }

    #[test]
    fn test_save_unchanged_issues_no_statement() {
        let (mock, db) = setup();
        let mut company = db.model("Company").unwrap().from_row(row! { "id" => 1 });
        assert_eq!(company.save().unwrap(), SaveOutcome::Unchanged);
        assert!(mock.statements().is_empty());
    }

    #[test]
    fn test_save_new_without_props() {
        let (mock, db) = setup();
        let mut company = db.model("Company").unwrap().instance(Row::new());
        assert!(matches!(company.save(), Err(TideError::EmptyObject)));
        assert!(mock.statements().is_empty());
    }

    #[test]
    fn test_save_updates_changed_columns_and_snapshot() {
        let (mock, db) = setup();
        mock.push_affected(1);
        let mut company = db
            .model("Company")
            .unwrap()
            .from_row(row! { "id" => 1, "name" => "Acme", "size" => 10 });
        company.set("name", "Acme Corp");

        assert_eq!(company.save().unwrap(), SaveOutcome::Updated(1));

        let statements = mock.statements();
        assert_eq!(
            statements[0].sql,
            r#"UPDATE "companies" SET "name" = $1 WHERE "id" = $2"#
        );
        assert_eq!(
            statements[0].values,
            vec![Value::from("Acme Corp"), Value::Int(Some(1))]
        );
        assert_eq!(company.old_props().get("name"), Some(&Value::from("Acme Corp")));
        assert!(company.changed_props().is_empty());
    }

    #[test]
    fn test_failed_save_keeps_snapshot() {
        let (mock, db) = setup();
        mock.fail_on("UPDATE");
        let mut company = db
            .model("Company")
            .unwrap()
            .from_row(row! { "id" => 1, "name" => "Acme" });
        company.set("name", "Acme Corp");

        assert!(company.save().is_err());

        assert_eq!(company.old_props().get("name"), Some(&Value::from("Acme")));
        assert_eq!(company.changed_props(), row! { "name" => "Acme Corp" });
    }

    #[test]
    fn test_save_new_inserts_and_returns_stored_row() {
        let (mock, db) = setup();
        mock.push_rows(vec![row! { "id" => 9, "name" => "Acme" }]);
        let mut company = db.model("Company").unwrap().instance(row! { "name" => "Acme" });

        let SaveOutcome::Inserted(stored) = company.save().unwrap() else {
            panic!("expected an insert");
        };

        assert!(!stored.is_new());
        assert_eq!(stored.get("id"), Some(&Value::Int(Some(9))));
        assert!(company.is_new());
        assert_eq!(
            mock.sql_log(),
            vec![r#"INSERT INTO "companies" ("name") VALUES ($1) RETURNING *"#.to_string()]
        );
    }

    #[test]
    fn test_saving_new_instance_twice_inserts_once() {
        let (mock, db) = setup();
        mock.push_rows(vec![row! { "id" => 9, "name" => "Acme" }]);
        mock.push_affected(1);
        let mut company = db.model("Company").unwrap().instance(row! { "name" => "Acme" });

        assert!(matches!(company.save().unwrap(), SaveOutcome::Inserted(_)));
        assert_eq!(company.save().unwrap(), SaveOutcome::Unchanged);
        assert!(company.changed_props().is_empty());

        // later changes update the stored row through its returned key
        company.set("name", "Acme Corp");
        assert_eq!(company.save().unwrap(), SaveOutcome::Updated(1));

        assert_eq!(
            mock.sql_log(),
            vec![
                r#"INSERT INTO "companies" ("name") VALUES ($1) RETURNING *"#.to_string(),
                r#"UPDATE "companies" SET "name" = $1 WHERE "id" = $2"#.to_string(),
            ]
        );
    }

    #[test]
    fn test_failed_insert_keeps_instance_unsaved() {
        let (mock, db) = setup();
        mock.fail_on("INSERT");
        let mut company = db.model("Company").unwrap().instance(row! { "name" => "Acme" });

        assert!(company.save().is_err());

        assert!(company.old_props().is_empty());
        assert_eq!(company.changed_props(), row! { "name" => "Acme" });
    }

    #[test]
    fn test_blacklisted_props_are_not_saved() {
        let (mock, db) = setup();
        mock.push_rows(vec![]);
        let mut account = db.model("Account").unwrap().instance(row! {
            "email" => "a@b.c",
            "password_confirmation" => "secret",
        });
        assert_eq!(account.changed_props(), row! { "email" => "a@b.c" });
        account.save().unwrap();
        assert!(!mock.sql_log()[0].contains("password_confirmation"));
    }

    #[test]
    fn test_validation_blocks_save_and_delete() {
        let (mock, db) = setup();
        let mut account = db.model("Account").unwrap().from_row(row! { "id" => 1 });
        account.set("name", "x");
        assert!(matches!(account.save(), Err(TideError::Validation(_))));
        assert!(matches!(account.del(), Err(TideError::Validation(_))));
        assert!(mock.statements().is_empty());
    }

    #[test]
    fn test_composite_key_filters_are_conjunctive() {
        let (_mock, db) = setup();
        let mut member = db
            .model("Membership")
            .unwrap()
            .from_row(row! { "company_id" => 1, "employee_id" => 2, "role" => "dev" });
        member.set("role", "lead").set("note", "ignored");

        let query = member.save_query().unwrap().unwrap();
        assert_eq!(
            query.to_sql().unwrap(),
            r#"UPDATE "memberships" SET "role" = 'lead' WHERE "company_id" = 1 AND "employee_id" = 2"#
        );
        assert_eq!(
            member.query().unwrap().to_sql().unwrap(),
            r#"SELECT * FROM "memberships" WHERE "company_id" = 1 AND "employee_id" = 2 LIMIT 1"#
        );
    }

    #[test]
    fn test_changed_key_still_addresses_stored_row() {
        let (_mock, db) = setup();
        let mut company = db.model("Company").unwrap().from_row(row! { "id" => 1 });
        company.set("id", 2);
        assert_eq!(
            company.save_query().unwrap().unwrap().to_sql().unwrap(),
            r#"UPDATE "companies" SET "id" = 2 WHERE "id" = 1"#
        );
    }

    #[test]
    fn test_new_instance_cannot_be_addressed() {
        let (_mock, db) = setup();
        let company = db.model("Company").unwrap().instance(row! { "id" => 1 });
        assert!(matches!(company.query(), Err(TideError::InexistentObject)));
        assert!(matches!(company.del(), Err(TideError::InexistentObject)));
        assert!(matches!(
            company.fetch_related(&[]),
            Err(TideError::InexistentObject)
        ));
    }

    #[test]
    fn test_missing_key_value() {
        // EDGE CASE: persisted row fetched without its key column
        let (_mock, db) = setup();
        let company = db.model("Company").unwrap().from_row(row! { "name" => "Acme" });
        assert!(matches!(company.delete_query(), Err(TideError::InexistentObject)));
    }

    #[test]
    fn test_model_without_key_columns() {
        // EDGE CASE: an empty key must not produce an unfiltered write
        let (mock, db) = setup();
        let mut entry = db
            .model("AuditEntry")
            .unwrap()
            .from_row(row! { "action" => "login" });
        assert!(matches!(entry.key_condition(), Err(TideError::InexistentObject)));
        assert!(matches!(entry.delete_query(), Err(TideError::InexistentObject)));
        assert!(matches!(entry.del(), Err(TideError::InexistentObject)));

        entry.set("action", "logout");
        assert!(matches!(entry.save(), Err(TideError::InexistentObject)));
        assert!(mock.statements().is_empty());
    }

    #[test]
    fn test_del() {
        let (mock, db) = setup();
        mock.push_affected(1);
        let company = db.model("Company").unwrap().from_row(row! { "id" => 4 });
        assert_eq!(company.del().unwrap(), 1);
        assert_eq!(mock.sql_log(), vec![r#"DELETE FROM "companies" WHERE "id" = $1"#.to_string()]);
    }

    #[test]
    fn test_key_case_only_changes_output() {
        let (_mock, db) = setup();
        let companies = db.model("Company").unwrap();
        let mut company = companies.from_row(row! { "id" => 1, "founded_at" => "1990" });
        let child = companies.from_row(row! { "parent_id" => 1 });
        company
            .related_map_mut()
            .insert("child_companies".to_string(), Related::Many(vec![child]));

        company.set_key_case(KeyCase::Camel);

        assert!(company.get("founded_at").is_some());
        assert!(company.old_props().contains_key("founded_at"));
        let expected = serde_json::json!({
            "id": 1,
            "foundedAt": "1990",
            "child_companies": [{ "parentId": 1 }],
        });
        assert_eq!(company.to_json(), expected);
        assert_eq!(serde_json::to_value(&company).unwrap(), expected);
    }

    #[test]
    fn test_serialize_includes_related() {
        let (_mock, db) = setup();
        let companies = db.model("Company").unwrap();
        let mut company = companies.from_row(row! { "id" => 1, "name" => "Acme" });
        company.related_map_mut().insert(
            "parent".to_string(),
            Related::One(Box::new(companies.from_row(row! { "id" => 0 }))),
        );

        let expected = serde_json::json!({ "id": 1, "name": "Acme", "parent": { "id": 0 } });
        assert_eq!(company.to_json(), expected);
        assert_eq!(serde_json::to_value(&company).unwrap(), expected);
    }
}
