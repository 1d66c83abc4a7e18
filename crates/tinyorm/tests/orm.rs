//! Entity layer behavior: defaults, hooks, CRUD and finders.

use std::sync::{Arc, OnceLock};
use tinyorm::prelude::*;
use tinyorm::{Error, FieldDef, Mapping, Record, TableMapping, Value};
use tinyorm_sqlite::SqliteDriver;

fn init_engine() {
    let _ = tinyorm::create_engine(SqliteDriver::memory());
}

struct Account {
    rec: Record,
}

impl Account {
    fn with_id(id: &str) -> Self {
        let mut rec = Record::new();
        rec.set("id", id);
        Self { rec }
    }
}

impl Entity for Account {
    fn mapping() -> Arc<TableMapping> {
        static MAPPING: OnceLock<Arc<TableMapping>> = OnceLock::new();
        Arc::clone(MAPPING.get_or_init(|| {
            Mapping::of("Account")
                .field(FieldDef::new("id", tinyorm::SqlType::VarChar(50)).primary_key())
                .field(FieldDef::integer("balance"))
                .register()
                .unwrap()
        }))
    }

    fn record(&self) -> &Record {
        &self.rec
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.rec
    }

    fn from_record(rec: Record) -> Self {
        Self { rec }
    }
}

struct User {
    rec: Record,
}

impl Entity for User {
    fn mapping() -> Arc<TableMapping> {
        static MAPPING: OnceLock<Arc<TableMapping>> = OnceLock::new();
        Arc::clone(MAPPING.get_or_init(|| {
            Mapping::of("User")
                .field(
                    FieldDef::new("id", tinyorm::SqlType::VarChar(50))
                        .primary_key()
                        .default_with(|| Value::from(next_id())),
                )
                .field(FieldDef::string("name"))
                .field(FieldDef::string("email").updatable(false))
                .register()
                .unwrap()
        }))
    }

    fn record(&self) -> &Record {
        &self.rec
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.rec
    }

    fn from_record(rec: Record) -> Self {
        Self { rec }
    }

    fn before_insert(&mut self) -> tinyorm::Result<()> {
        if !self.rec.contains("name") {
            self.rec.set("name", "anonymous");
        }
        Ok(())
    }
}

/// Entity with a required field that has no default.
struct Ledger {
    rec: Record,
}

impl Entity for Ledger {
    fn mapping() -> Arc<TableMapping> {
        static MAPPING: OnceLock<Arc<TableMapping>> = OnceLock::new();
        Arc::clone(MAPPING.get_or_init(|| {
            Mapping::of("Ledger")
                .field(
                    FieldDef::new("id", tinyorm::SqlType::VarChar(50))
                        .primary_key()
                        .default_with(|| Value::from(next_id())),
                )
                .field(FieldDef::new("amount", tinyorm::SqlType::BigInt))
                .register()
                .unwrap()
        }))
    }

    fn record(&self) -> &Record {
        &self.rec
    }

    fn record_mut(&mut self) -> &mut Record {
        &mut self.rec
    }

    fn from_record(rec: Record) -> Self {
        Self { rec }
    }
}

#[test]
fn insert_fills_defaults_and_round_trips() {
    init_engine();
    with_connection(|| {
        execute(&Account::create_table_sql(), &[])?;

        let mut account = Account::with_id("a-1");
        account.insert()?;

        // The record was mutated with the substituted default.
        assert_eq!(account.record().get_as::<i64>("balance")?, 0);

        let fetched = Account::get("a-1")?.expect("account should exist");
        assert_eq!(fetched.record().get_as::<i64>("balance")?, 0);
        Ok(())
    })
    .unwrap();
}

#[test]
fn missing_required_field_without_default_fails_validation() {
    init_engine();
    let err = with_connection(|| {
        execute(&Ledger::create_table_sql(), &[])?;

        let mut entry = Ledger::from_record(Record::new());
        entry.insert().map(|_| ())
    })
    .unwrap_err();

    match err {
        Error::Validation(e) => assert_eq!(e.field, "amount"),
        other => panic!("expected validation error, got {other}"),
    }
}

#[test]
fn update_changes_the_matched_row() {
    init_engine();
    with_connection(|| {
        execute(&Account::create_table_sql(), &[])?;

        let mut account = Account::with_id("a-1");
        account.record_mut().set("balance", 100_i64);
        account.insert()?;

        account.record_mut().set("balance", 250_i64);
        let affected = account.update()?;
        assert_eq!(affected, 1);

        let fetched = Account::get("a-1")?.expect("account should exist");
        assert_eq!(fetched.record().get_as::<i64>("balance")?, 250);
        Ok(())
    })
    .unwrap();
}

#[test]
fn delete_removes_the_matched_row() {
    init_engine();
    with_connection(|| {
        execute(&Account::create_table_sql(), &[])?;

        let mut account = Account::with_id("a-1");
        account.insert()?;
        assert_eq!(Account::count_all()?, 1);

        let affected = account.delete()?;
        assert_eq!(affected, 1);
        assert!(Account::get("a-1")?.is_none());
        Ok(())
    })
    .unwrap();
}

#[test]
fn finders_filter_and_count() {
    init_engine();
    with_connection(|| {
        execute(&Account::create_table_sql(), &[])?;

        for (id, balance) in [("a-1", 10_i64), ("a-2", 20), ("a-3", 30)] {
            let mut account = Account::with_id(id);
            account.record_mut().set("balance", balance);
            account.insert()?;
        }

        let all = Account::find_all()?;
        assert_eq!(all.len(), 3);

        let rich = Account::find_by("WHERE balance > ? ORDER BY id", &[Value::from(15_i64)])?;
        assert_eq!(rich.len(), 2);
        assert_eq!(rich[0].record().get_as::<String>("id")?, "a-2");

        let first = Account::find_first("ORDER BY balance DESC", &[])?
            .expect("accounts should exist");
        assert_eq!(first.record().get_as::<i64>("balance")?, 30);

        assert_eq!(Account::count_all()?, 3);
        assert_eq!(
            Account::count_by("WHERE balance < ?", &[Value::from(25_i64)])?,
            2
        );
        Ok(())
    })
    .unwrap();
}

#[test]
fn supplier_defaults_generate_fresh_ids_per_insert() {
    init_engine();
    with_connection(|| {
        execute(&User::create_table_sql(), &[])?;

        let mut first = User::from_record(Record::new());
        let mut second = User::from_record(Record::new());
        first.insert()?;
        second.insert()?;

        let first_id = first.record().get_as::<String>("id")?;
        let second_id = second.record().get_as::<String>("id")?;
        assert_eq!(first_id.len(), 50);
        assert_ne!(first_id, second_id);
        Ok(())
    })
    .unwrap();
}

#[test]
fn before_insert_hook_runs_before_validation() {
    init_engine();
    with_connection(|| {
        execute(&User::create_table_sql(), &[])?;

        let mut user = User::from_record(Record::new());
        user.insert()?;
        assert_eq!(user.record().get_as::<String>("name")?, "anonymous");
        Ok(())
    })
    .unwrap();
}

#[test]
fn duplicate_primary_key_is_a_constraint_error() {
    init_engine();
    let err = with_connection(|| {
        execute(&Account::create_table_sql(), &[])?;

        Account::with_id("a-1").insert()?;
        Account::with_id("a-1").insert().map(|_| ())
    })
    .unwrap_err();

    assert!(err.is_constraint());
}

#[test]
fn entity_writes_join_enclosing_transactions() {
    init_engine();
    with_connection(|| {
        execute(&Account::create_table_sql(), &[])?;

        let result: tinyorm::Result<()> = transaction(|| {
            Account::with_id("a-1").insert()?;
            Account::with_id("a-2").insert()?;
            Err(Error::query("boom"))
        });
        assert!(result.is_err());
        assert_eq!(Account::count_all()?, 0);

        transaction(|| {
            Account::with_id("a-1").insert()?;
            Ok(())
        })?;
        assert_eq!(Account::count_all()?, 1);
        Ok(())
    })
    .unwrap();
}

#[test]
fn create_table_sql_matches_declaration() {
    assert_eq!(
        Account::create_table_sql(),
        "CREATE TABLE account (id VARCHAR(50) NOT NULL, balance BIGINT NOT NULL, PRIMARY KEY(id));"
    );
}
