//! Integration tests for record mapping through `Db` and the mock connector.

mod common;

use common::{MockConnector, row};
use sqlrecord::{Db, DbError, Record, TableRegistry, Value, args, impl_record};

#[derive(Debug, Default, Clone, PartialEq)]
struct Audit {
    created_by: String,
    revision: i64,
}

impl_record! {
    Audit {
        created_by => "created_by,nullempty",
        revision => "revision,nowrite",
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct OrderLine {
    id: i64,
    sku: String,
    quantity: i32,
    note: Option<String>,
    audit: Audit,
    // not bound
    scratch: String,
}

impl_record! {
    OrderLine {
        #[id] id => "id,nowrite",
        sku => "sku",
        quantity => "quantity",
        note => "note",
        #[embed] audit,
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Label {
    text: String,
}

impl_record! {
    Label {
        text => "label",
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Contact {
    name: String,
    label: Label,
}

impl_record! {
    Contact {
        name => "name",
        #[embed] label,
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Customer {
    id: i64,
    contact: Contact,
    name: String,
    tier: String,
}

impl_record! {
    Customer {
        #[id] id => "id,nowrite",
        #[embed] contact,
        name => "name",
        tier => "tier",
    }
}

fn order_line_row(id: i64, sku: &str) -> sqlrecord::Row {
    row([
        ("id", Value::Int(id)),
        ("sku", Value::from(sku)),
        ("quantity", Value::Int(2)),
        ("note", Value::Null(sqlrecord::Kind::Text)),
        ("created_by", Value::from("ops")),
        ("revision", Value::Int(5)),
        ("updated_at", Value::Unsupported("INTERVAL".into())),
    ])
}

#[tokio::test]
async fn test_default_and_registered_table_names() {
    let connector = MockConnector::empty();
    let journal = connector.journal();

    let db = Db::new(connector.clone(), TableRegistry::new());
    db.get_all::<OrderLine>("true", &[]).await.unwrap();

    let tables = TableRegistry::new().with_table::<OrderLine>("order_lines");
    let db = Db::new(connector, tables);
    db.get_all::<OrderLine>("sku=$1", &args!["A-1"]).await.unwrap();

    assert_eq!(
        journal.statements(),
        vec![
            r#"select * from "orderlines" where true"#,
            r#"select * from "order_lines" where sku=$1"#,
        ]
    );
}

#[tokio::test]
async fn test_get_hydrates_embedded_and_skips_unmapped() {
    let connector = MockConnector::new(|_, _| Ok(vec![order_line_row(3, "A-1")]));
    let db = Db::new(connector, TableRegistry::new());

    let line = db
        .get::<OrderLine>("id=$1", &args![3i64])
        .await
        .unwrap()
        .unwrap();

    assert_eq!(line.id, 3);
    assert_eq!(line.quantity, 2);
    assert_eq!(line.note, None);
    assert_eq!(
        line.audit,
        Audit {
            created_by: "ops".into(),
            revision: 5
        }
    );
    assert_eq!(line.id(), 3);
}

#[tokio::test]
async fn test_get_returns_none_when_nothing_matches() {
    let db = Db::new(MockConnector::empty(), TableRegistry::new());
    let line = db.get::<OrderLine>("id=$1", &args![99i64]).await.unwrap();
    assert!(line.is_none());
}

#[tokio::test]
async fn test_fetch_one_keeps_record_when_nothing_matches() {
    let db = Db::new(MockConnector::empty(), TableRegistry::new());
    let mut line = OrderLine {
        sku: "keep".into(),
        ..Default::default()
    };
    assert!(!db.fetch_one(&mut line, "id=$1", &args![1i64]).await.unwrap());
    assert_eq!(line.sku, "keep");
}

#[tokio::test]
async fn test_get_all_preserves_cursor_order() {
    let connector = MockConnector::new(|_, _| {
        Ok(vec![order_line_row(2, "B"), order_line_row(1, "A")])
    });
    let db = Db::new(connector, TableRegistry::new());

    let lines = db.get_all::<OrderLine>("true", &[]).await.unwrap();
    let skus: Vec<&str> = lines.iter().map(|l| l.sku.as_str()).collect();
    assert_eq!(skus, vec!["B", "A"]);
}

#[tokio::test]
async fn test_insert_skips_nowrite_and_empty_columns() {
    let connector = MockConnector::new(|_, _| Ok(vec![order_line_row(10, "C-3")]));
    let journal = connector.journal();
    let db = Db::new(connector, TableRegistry::new());

    let mut line = OrderLine {
        id: 42,
        sku: "C-3".into(),
        quantity: 2,
        scratch: "local".into(),
        ..Default::default()
    };
    db.insert(&mut line).await.unwrap();

    let (sql, args) = journal.entries().remove(0);
    assert_eq!(
        sql,
        r#"insert into "orderlines" ("sku", "quantity") values ($1, $2) returning *"#
    );
    assert_eq!(args, vec![Value::from("C-3"), Value::Int(2)]);
    // reloaded from the returned row; unbound fields untouched
    assert_eq!(line.id, 10);
    assert_eq!(line.audit.revision, 5);
    assert_eq!(line.scratch, "local");
}

#[tokio::test]
async fn test_insert_without_returned_row_fails() {
    let db = Db::new(MockConnector::empty(), TableRegistry::new());
    let mut line = OrderLine::default();
    let err = db.insert(&mut line).await.unwrap_err();
    assert!(matches!(err, DbError::Internal { .. }));
}

#[tokio::test]
async fn test_update_writes_every_writable_column() {
    let connector = MockConnector::new(|_, _| Ok(vec![order_line_row(7, "D-4")]));
    let journal = connector.journal();
    let db = Db::new(connector, TableRegistry::new());

    let mut line = OrderLine {
        id: 7,
        sku: "D-4".into(),
        ..Default::default()
    };
    db.update(&mut line).await.unwrap();

    let (sql, args) = journal.entries().remove(0);
    assert_eq!(
        sql,
        r#"update "orderlines" set "sku"=$2, "quantity"=$3, "note"=$4, "created_by"=$5 where id=$1 returning *"#
    );
    assert_eq!(
        args,
        vec![
            Value::Int(7),
            Value::from("D-4"),
            Value::Int(0),
            Value::Null(sqlrecord::Kind::Text),
            Value::from(""),
        ]
    );
    assert_eq!(line.audit.created_by, "ops");
}

#[tokio::test]
async fn test_update_of_missing_row_fails_with_pk() {
    let db = Db::new(MockConnector::empty(), TableRegistry::new());
    let mut line = OrderLine {
        id: 404,
        sku: "gone".into(),
        ..Default::default()
    };

    let err = db.update(&mut line).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "update failed, did you mean to insert instead? record=orderlines:404"
    );
    assert_eq!(line.sku, "gone");
}

#[tokio::test]
async fn test_complete_statement_predicate() {
    let connector = MockConnector::new(|_, _| Ok(vec![order_line_row(1, "A")]));
    let journal = connector.journal();
    let db = Db::new(connector, TableRegistry::new());

    db.get_all::<OrderLine>(
        r#":select l.* from "orderlines" l join "orders" o on o.id = l.order_id where o.id=$1"#,
        &args![1i64],
    )
    .await
    .unwrap();

    assert_eq!(
        journal.statements()[0],
        r#"select l.* from "orderlines" l join "orders" o on o.id = l.order_id where o.id=$1"#
    );
}

#[tokio::test]
async fn test_empty_predicate_is_rejected() {
    let connector = MockConnector::empty();
    let journal = connector.journal();
    let db = Db::new(connector, TableRegistry::new());

    let err = db.get_all::<OrderLine>("", &[]).await.unwrap_err();
    assert!(matches!(err, DbError::InvalidInput { .. }));
    assert!(journal.statements().is_empty());
}

#[tokio::test]
async fn test_bound_unsupported_column_fails_to_decode() {
    let connector = MockConnector::new(|_, _| {
        Ok(vec![row([
            ("id", Value::Int(1)),
            ("quantity", Value::Unsupported("NUMERIC".into())),
        ])])
    });
    let db = Db::new(connector, TableRegistry::new());

    let err = db.get::<OrderLine>("id=$1", &args![1i64]).await.unwrap_err();
    match err {
        DbError::Decode { column, .. } => assert_eq!(column, "quantity"),
        other => panic!("expected Decode, got {other:?}"),
    }
}

#[tokio::test]
async fn test_duplicate_column_resolves_to_last_declared() {
    let names: Vec<&str> = Customer::schema().columns().iter().map(|c| c.name()).collect();
    assert_eq!(names, vec!["id", "name", "label", "name", "tier"]);

    let connector = MockConnector::new(|_, _| {
        Ok(vec![row([
            ("id", Value::Int(1)),
            ("name", Value::from("X")),
            ("label", Value::from("D")),
        ])])
    });
    let journal = connector.journal();
    let db = Db::new(connector, TableRegistry::new());

    let mut customer = db
        .get::<Customer>("id=$1", &args![1i64])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(customer.name, "X");
    assert_eq!(customer.contact.name, "");
    assert_eq!(customer.contact.label.text, "D");

    customer.contact.name = "inner".into();
    db.update(&mut customer).await.unwrap();
    let (sql, args) = journal.entries().remove(1);
    assert_eq!(
        sql,
        r#"update "customers" set "name"=$2, "label"=$3, "name"=$4, "tier"=$5 where id=$1 returning *"#
    );
    assert_eq!(args[1], Value::from("inner"));
    assert_eq!(args[3], Value::from("X"));
}

#[tokio::test]
async fn test_get_returns_row_with_zero_id() {
    let connector = MockConnector::new(|_, _| Ok(vec![order_line_row(0, "Z-0")]));
    let db = Db::new(connector, TableRegistry::new());

    let line = db.get::<OrderLine>("sku=$1", &args!["Z-0"]).await.unwrap();
    assert_eq!(line.map(|l| l.sku).as_deref(), Some("Z-0"));
}
