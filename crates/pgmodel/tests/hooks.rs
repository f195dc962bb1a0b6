//! Record hooks around terminal operations.

mod common;

use common::{try_connect, unique};
use pgmodel::{Hooks, Model, ModelError, ModelResult, QueryType, Record, params, query_raw};

#[derive(Debug, Clone, Default, Record)]
#[orm(table = "employees", hooks)]
struct MyEmployee {
    id: Option<i64>,
    name: Option<String>,
    age: Option<i32>,
}

impl Hooks for MyEmployee {
    fn before_execute(&mut self, query_type: QueryType) -> ModelResult<()> {
        if matches!(query_type, QueryType::Insert | QueryType::Update) {
            match self.age {
                Some(0) => return Err(ModelError::aborted("age must not be zero")),
                Some(age) => self.age = Some(age * 2),
                None => {}
            }
        }
        Ok(())
    }

    fn after_execute(&mut self, query_type: QueryType, success: bool) -> ModelResult<()> {
        if query_type == QueryType::Select && success {
            self.age = self.age.map(|age| age / 2);
        }
        Ok(())
    }
}

async fn stored_age(db: &pgmodel::Database, id: i64) -> ModelResult<Option<i32>> {
    let rows = query_raw(db, "employees", "SELECT age FROM employees WHERE id = ?", &params![id]).await?;
    Ok(rows.first().and_then(|row| match row.get("age") {
        Some(pgmodel::Value::Int(age)) => Some(*age),
        _ => None,
    }))
}

#[tokio::test]
async fn hooks_rewrite_written_and_fetched_values() -> ModelResult<()> {
    let Some(db) = try_connect("hooks_rewrite_written_and_fetched_values").await? else {
        return Ok(());
    };

    let mut model = Model::from_record(MyEmployee {
        name: Some(unique("hooked")),
        age: Some(21),
        ..Default::default()
    });
    let id = model.create(&db).await?;
    assert_eq!(model.record().age, Some(42));
    assert_eq!(stored_age(&db, id).await?, Some(42));

    let found = Model::<MyEmployee>::new().find(&db, id).await?.unwrap();
    assert_eq!(found.record().age, Some(21));
    // The column store keeps the value as read.
    assert_eq!(found.get_i32("age"), Some(42));
    Ok(())
}

#[tokio::test]
async fn aborting_hook_sends_nothing() -> ModelResult<()> {
    let Some(db) = try_connect("aborting_hook_sends_nothing").await? else {
        return Ok(());
    };
    let name = unique("aborted");

    let mut model = Model::from_record(MyEmployee {
        name: Some(name.clone()),
        age: Some(0),
        ..Default::default()
    });
    let err = model.create(&db).await.unwrap_err();
    assert!(err.is_aborted());
    assert_eq!(model.id(), None);

    let rows = Model::<MyEmployee>::new()
        .where_clause("name = ?", params![name.as_str()])
        .fetch(&db)
        .await?;
    assert!(rows.is_empty());
    Ok(())
}

#[tokio::test]
async fn disabled_hooks_are_skipped() -> ModelResult<()> {
    let Some(db) = try_connect("disabled_hooks_are_skipped").await? else {
        return Ok(());
    };

    let mut model = Model::from_record(MyEmployee {
        name: Some(unique("plain")),
        age: Some(10),
        ..Default::default()
    });
    model.set_enable_before_execute(false);
    let id = model.create(&db).await?;
    assert_eq!(stored_age(&db, id).await?, Some(10));

    let mut query = Model::<MyEmployee>::new();
    query.set_enable_after_execute(false);
    let found = query.find(&db, id).await?.unwrap();
    assert_eq!(found.record().age, Some(10));
    Ok(())
}
