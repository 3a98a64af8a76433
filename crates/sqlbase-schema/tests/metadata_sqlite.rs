use sqlbase_core::{
    Connection, FieldInfo, ReferentialAction, SqlType, UniqueConstraint, Value,
};
use sqlbase_schema::{MetaData, TableDef};
use sqlbase_session::{DbConfig, Session};
use sqlbase_sqlite::SqliteConnection;

static PERSON_FIELDS: [FieldInfo; 4] = [
    FieldInfo::ID,
    FieldInfo::CREATEDTS,
    FieldInfo::UPDATEDTS,
    FieldInfo::new("name", SqlType::Text).unique(true),
];

static CAR_FIELDS: [FieldInfo; 6] = [
    FieldInfo::ID,
    FieldInfo::CREATEDTS,
    FieldInfo::UPDATEDTS,
    FieldInfo::new("make", SqlType::Text),
    FieldInfo::new("model", SqlType::Text),
    FieldInfo::new("owner_id", SqlType::Integer)
        .nullable(true)
        .references("persons")
        .on_delete(ReferentialAction::Cascade),
];

static CAR_UNIQUES: [UniqueConstraint; 1] =
    [UniqueConstraint::new("uidx_cars_makemodel", &["make", "model"])];

fn metadata() -> MetaData {
    let mut meta = MetaData::new();
    meta.register_table(TableDef {
        name: "cars",
        fields: &CAR_FIELDS,
        unique_constraints: &CAR_UNIQUES,
    })
    .register_table(TableDef {
        name: "persons",
        fields: &PERSON_FIELDS,
        unique_constraints: &[],
    });
    meta
}

fn session() -> Session {
    let conn = SqliteConnection::open_in_memory().expect("open sqlite memory db");
    Session::new(Box::new(conn))
}

fn table_names(session: &Session) -> Vec<String> {
    session
        .query(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            &[],
        )
        .expect("list tables")
        .iter()
        .map(|r| r.get_as("name").expect("name"))
        .collect()
}

#[test]
fn create_all_creates_tables_in_dependency_order() {
    let meta = metadata();
    let mut session = session();
    meta.create_all(&mut session).expect("create_all");
    meta.create_all(&mut session).expect("create_all is repeatable");
    assert_eq!(table_names(&session), vec!["cars", "persons"]);

    let person = session
        .insert("INSERT INTO persons (name) VALUES (?1)", &[Value::from("ann")])
        .expect("insert person");
    session
        .insert(
            "INSERT INTO cars (make, model, owner_id) VALUES (?1, ?2, ?3)",
            &[Value::from("ford"), Value::from("t"), Value::BigInt(person)],
        )
        .expect("insert car");

    let dup = session
        .insert(
            "INSERT INTO cars (make, model) VALUES (?1, ?2)",
            &[Value::from("ford"), Value::from("t")],
        )
        .expect_err("composite unique index");
    assert!(dup.is_unique_violation(sqlbase_core::Dialect::Sqlite, Some("make")));

    let row = session
        .query_one("SELECT createdts, updatedts FROM persons", &[])
        .expect("query person")
        .expect("person row");
    assert!(!row.get_named("createdts").expect("createdts").is_null());
    assert!(row.get_named("updatedts").expect("updatedts").is_null());

    session
        .execute("DELETE FROM persons", &[])
        .expect("delete person");
    let cars: i64 = session
        .query_one("SELECT COUNT(*) AS n FROM cars", &[])
        .expect("count")
        .expect("row")
        .get_as("n")
        .expect("n");
    assert_eq!(cars, 0, "ON DELETE CASCADE applies");
}

#[test]
fn clear_db_data_keeps_tables() {
    let meta = metadata();
    let mut session = session();
    meta.create_all(&mut session).expect("create_all");
    let person = session
        .insert("INSERT INTO persons (name) VALUES (?1)", &[Value::from("bob")])
        .expect("insert person");
    session
        .insert(
            "INSERT INTO cars (make, model, owner_id) VALUES ('a', 'b', ?1)",
            &[Value::BigInt(person)],
        )
        .expect("insert car");

    let deleted = meta.clear_db_data(&mut session).expect("clear data");
    assert_eq!(deleted, 2);
    assert_eq!(table_names(&session), vec!["cars", "persons"]);
}

#[test]
fn clear_db_removes_unregistered_tables_and_views() {
    let meta = metadata();
    let mut session = session();
    meta.create_all(&mut session).expect("create_all");
    session
        .execute_raw(
            "CREATE TABLE legacy (id INTEGER PRIMARY KEY, car_id INTEGER REFERENCES cars (id));
             CREATE VIEW v_owned AS SELECT c.make, p.name FROM cars c JOIN persons p ON p.id = c.owner_id;",
        )
        .expect("unregistered objects");
    let person = session
        .insert("INSERT INTO persons (name) VALUES ('ann')", &[])
        .expect("insert person");
    let car = session
        .insert(
            "INSERT INTO cars (make, model, owner_id) VALUES ('ford', 't', ?1)",
            &[Value::BigInt(person)],
        )
        .expect("insert car");
    session
        .insert("INSERT INTO legacy (car_id) VALUES (?1)", &[Value::BigInt(car)])
        .expect("insert legacy row");

    meta.clear_db(&mut session).expect("clear_db");
    assert!(table_names(&session).is_empty());
    let views = session
        .query("SELECT name FROM sqlite_master WHERE type = 'view'", &[])
        .expect("list views");
    assert!(views.is_empty());
    assert!(!session.in_transaction());

    meta.create_all(&mut session).expect("create_all after clear");
    assert_eq!(table_names(&session), vec!["cars", "persons"]);
}

#[test]
fn pre_test_init_follows_config() {
    let meta = metadata();
    let mut session = session();

    let off = DbConfig::new("sqlite://").pre_test_init(false);
    assert!(!meta.pre_test_init(&mut session, &off).expect("disabled"));
    assert!(table_names(&session).is_empty());

    let data_only = DbConfig::new("sqlite://").clear_data_only(true);
    assert!(meta.pre_test_init(&mut session, &data_only).expect("data only on empty db"));
    assert_eq!(table_names(&session), vec!["cars", "persons"]);

    session
        .insert("INSERT INTO persons (name) VALUES ('x')", &[])
        .expect("insert");
    let full = DbConfig::new("sqlite://");
    assert!(meta.pre_test_init(&mut session, &full).expect("full reset"));
    let rows = session
        .query("SELECT id FROM persons", &[])
        .expect("persons");
    assert!(rows.is_empty());

    meta.drop_all(&mut session).expect("drop_all");
    assert!(table_names(&session).is_empty());
}
