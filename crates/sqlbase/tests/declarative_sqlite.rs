use serde_json::json;
use sqlbase::prelude::*;
use sqlbase_sqlite::SqliteConnection;

#[derive(Debug, Clone, Default, PartialEq, Record)]
#[record(table = "cars")]
#[record(unique(name = "uidx_cars_makemodel", columns("make", "model")))]
struct Car {
    #[record(meta)]
    meta: RecordMeta,
    make: String,
    model: String,
    year: Option<i64>,
    electric: bool,
}

fn session() -> Session {
    let conn = SqliteConnection::open_in_memory().expect("open sqlite memory db");
    let mut session = Session::new(Box::new(conn));
    MetaData::new()
        .with::<Car>()
        .create_all(&mut session)
        .expect("create tables");
    session
}

fn seed(session: &mut Session) {
    for (make, model, year) in [("ford", "t", 1927), ("ford", "focus", 2004), ("fiat", "uno", 1990)] {
        Car::add(session, json!({"make": make, "model": model, "year": year})).expect("seed car");
    }
}

#[test]
fn add_returns_stored_record() {
    let mut session = session();
    let car = Car::add(&mut session, json!({"make": "ford", "model": "t", "year": "1927"}))
        .expect("add car");
    assert_eq!(car.id(), Some(1));
    assert_eq!(car.make, "ford");
    assert_eq!(car.year, Some(1927));
    assert!(!car.electric);
    assert!(car.meta.createdts.is_some(), "created timestamp comes from storage");
    assert!(car.meta.updatedts.is_none());
    assert!(!session.in_transaction());
}

#[test]
fn add_rejects_unknown_columns_and_non_objects() {
    let mut session = session();
    let err = Car::add(&mut session, json!({"make": "ford", "colour": "black"}))
        .expect_err("unknown column");
    assert!(matches!(err, Error::Usage(_)), "{err:?}");

    let err = Car::add(&mut session, json!(["ford"])).expect_err("not an object");
    assert!(matches!(err, Error::Usage(_)), "{err:?}");
    assert_eq!(Car::count(&session).expect("count"), 0);
}

#[test]
fn add_iu_skips_duplicates() {
    let mut session = session();
    let first = Car::add_iu(&mut session, json!({"make": "ford", "model": "t"}))
        .expect("first insert");
    assert!(first.is_some());

    let dup = Car::add_iu(&mut session, json!({"make": "ford", "model": "t", "year": 1930}))
        .expect("duplicate is not an error");
    assert!(dup.is_none());
    assert_eq!(Car::count(&session).expect("count"), 1);

    let err = Car::add(&mut session, json!({"make": "ford", "model": "t"}))
        .expect_err("plain add still fails");
    assert!(err.is_unique_violation(Dialect::Sqlite, Some("model")));
}

#[test]
fn session_stays_usable_after_unique_violations() {
    let mut session = session();
    Car::add(&mut session, json!({"make": "ford", "model": "t"})).expect("first add");

    Car::add(&mut session, json!({"make": "ford", "model": "t"})).expect_err("duplicate add");
    assert!(!session.in_transaction());
    let focus = Car::add(&mut session, json!({"make": "ford", "model": "focus"}))
        .expect("add after failed add");
    assert_eq!(focus.model, "focus");

    let skipped = Car::add_iu(&mut session, json!({"make": "ford", "model": "focus"}))
        .expect("swallowed duplicate");
    assert!(skipped.is_none());
    assert!(!session.in_transaction());
    let uno = Car::add(&mut session, json!({"make": "fiat", "model": "uno"}))
        .expect("add after swallowed duplicate");
    assert_eq!(uno.make, "fiat");
    assert_eq!(Car::count(&session).expect("count"), 3);
}

#[test]
fn timestamps_follow_the_record_lifecycle() {
    let mut session = session();
    let car = Car::add(&mut session, json!({"make": "ford", "model": "t"})).expect("add");
    assert!(car.meta.createdts.is_some());
    assert!(car.meta.updatedts.is_none(), "never edited");

    let edited = Car::edit(&mut session, json!({"id": car.id(), "year": 1927})).expect("edit");
    assert_eq!(edited.meta.createdts, car.meta.createdts);
    assert!(edited.meta.updatedts.is_some());
}

#[test]
fn to_dict_then_from_dict_rebuilds_the_record() {
    let mut session = session();
    Car::add(&mut session, json!({"make": "ford", "model": "t"})).expect("add");
    let stored = Car::edit(&mut session, json!({"id": 1, "year": 1927, "electric": true}))
        .expect("edit");

    let mut copy = Car::default();
    copy.from_dict(&mut session, serde_json::Value::Object(stored.to_dict(&[])))
        .expect("from_dict");
    assert_eq!(copy, stored);
}

#[test]
fn edit_updates_columns_and_timestamp() {
    let mut session = session();
    let car = Car::add(&mut session, json!({"make": "ford", "model": "t"})).expect("add");

    let edited = Car::edit(&mut session, json!({"id": car.id(), "year": 1928, "electric": true}))
        .expect("edit");
    assert_eq!(edited.id(), car.id());
    assert_eq!(edited.year, Some(1928));
    assert!(edited.electric);
    assert_eq!(edited.make, "ford");
    assert_eq!(edited.meta.createdts, car.meta.createdts);
    assert!(edited.meta.updatedts.is_some());
}

#[test]
fn edit_requires_an_existing_id() {
    let mut session = session();
    let err = Car::edit(&mut session, json!({"year": 1928})).expect_err("no id");
    assert!(matches!(err, Error::Usage(_)), "{err:?}");

    let err = Car::edit(&mut session, json!({"id": "x"})).expect_err("bad id");
    assert!(matches!(err, Error::Usage(_)), "{err:?}");

    let err = Car::edit(&mut session, json!({"id": 42, "year": 1928})).expect_err("missing row");
    assert!(matches!(err, Error::NoResultFound), "{err:?}");
}

#[test]
fn update_adds_or_edits() {
    let mut session = session();
    let added = Car::update(&mut session, json!({"make": "fiat", "model": "uno"})).expect("add");
    let edited = Car::update(&mut session, json!({"id": added.id(), "year": 1990})).expect("edit");
    assert_eq!(edited.id(), added.id());
    assert_eq!(edited.year, Some(1990));
    assert_eq!(Car::count(&session).expect("count"), 1);
}

#[test]
fn get_variants_distinguish_none_and_many() {
    let mut session = session();
    seed(&mut session);

    assert_eq!(Car::get(&session, 2).expect("get").map(|c| c.model), Some("focus".to_string()));
    assert!(Car::get(&session, 99).expect("get missing").is_none());

    let uno = Car::get_by(&session, &[("make", "fiat".into())]).expect("get_by");
    assert_eq!(uno.map(|c| c.model), Some("uno".to_string()));

    let err = Car::get_by(&session, &[("make", "ford".into())]).expect_err("two fords");
    assert!(matches!(err, Error::MultipleResultsFound { count: 2 }), "{err:?}");

    let none = Car::get_where(&session, Expr::col("year").gt(2020)).expect("get_where");
    assert!(none.is_none());

    let err = Car::one(&session, Expr::col("year").gt(2020)).expect_err("no match");
    assert!(matches!(err, Error::NoResultFound));
    let focus = Car::one(&session, Expr::col("year").gt(2000)).expect("one match");
    assert_eq!(focus.model, "focus");

    let err = Car::get_by(&session, &[("colour", "red".into())]).expect_err("unknown column");
    assert!(matches!(err, Error::Usage(_)), "{err:?}");
}

#[test]
fn first_and_list_respect_order() {
    let mut session = session();
    seed(&mut session);

    let first = Car::first(&session, &[]).expect("first").expect("some car");
    assert_eq!(first.model, "t", "default order is by id");

    let newest = Car::first(&session, &[OrderBy::desc("year")])
        .expect("first")
        .expect("some car");
    assert_eq!(newest.model, "focus");

    let oldest_ford = Car::first_by(&session, &[("make", "ford".into())], &[OrderBy::asc("year")])
        .expect("first_by")
        .expect("a ford");
    assert_eq!(oldest_ford.model, "t");

    let none = Car::first_where(&session, Expr::col("make").eq("vw"), &[]).expect("first_where");
    assert!(none.is_none());

    let models: Vec<String> = Car::list(&session, &[OrderBy::asc("model")])
        .expect("list")
        .into_iter()
        .map(|c| c.model)
        .collect();
    assert_eq!(models, vec!["focus", "t", "uno"]);

    let fords = Car::list_by(&session, &[("make", "ford".into())], &[]).expect("list_by");
    assert_eq!(fords.len(), 2);

    let old = Car::list_where(&session, Expr::col("year").lt(2000), &[OrderBy::desc("year")])
        .expect("list_where");
    assert_eq!(old.iter().map(|c| c.year).collect::<Vec<_>>(), vec![Some(1990), Some(1927)]);

    let err = Car::list(&session, &[OrderBy::asc("colour")]).expect_err("unknown order column");
    assert!(matches!(err, Error::Usage(_)), "{err:?}");
}

#[test]
fn pairs_and_counts() {
    let mut session = session();
    seed(&mut session);

    let pairs = Car::pairs(&session, "id", "model", &[]).expect("pairs");
    assert_eq!(
        pairs,
        vec![
            (Value::BigInt(1), Value::from("t")),
            (Value::BigInt(2), Value::from("focus")),
            (Value::BigInt(3), Value::from("uno")),
        ]
    );

    let fords = Car::pairs_by(&session, "model", "year", &[("make", "ford".into())], &[OrderBy::desc("year")])
        .expect("pairs_by");
    assert_eq!(fords[0], (Value::from("focus"), Value::BigInt(2004)));

    let recent = Car::pairs_where(&session, "make", "model", Expr::col("year").ge(1990), &[])
        .expect("pairs_where");
    assert_eq!(recent.len(), 2);

    let err = Car::pairs(&session, "id", "colour", &[]).expect_err("unknown value column");
    assert!(matches!(err, Error::Usage(_)), "{err:?}");

    assert_eq!(Car::count(&session).expect("count"), 3);
    assert_eq!(Car::count_by(&session, &[("make", "ford".into())]).expect("count_by"), 2);
    assert_eq!(
        Car::count_where(&session, Expr::col("year").is_null()).expect("count_where"),
        0
    );
}

#[test]
fn delete_variants() {
    let mut session = session();
    seed(&mut session);

    assert!(Car::delete(&mut session, 1).expect("delete"));
    assert!(!Car::delete(&mut session, 1).expect("delete again"));
    assert_eq!(
        Car::delete_where(&mut session, Expr::col("make").eq("fiat")).expect("delete_where"),
        1
    );
    assert_eq!(Car::delete_all(&mut session).expect("delete_all"), 1);
    assert_eq!(Car::count(&session).expect("count"), 0);
}

#[test]
fn save_inserts_then_updates() {
    let mut session = session();
    let mut car = Car {
        make: "vw".to_string(),
        model: "golf".to_string(),
        ..Car::default()
    };
    car.save(&mut session).expect("insert");
    let id = car.id().expect("id after save");
    assert!(car.meta.createdts.is_some());

    car.year = Some(1974);
    car.save(&mut session).expect("update");
    assert!(car.meta.updatedts.is_some());

    let mut stale = Car::get(&session, id).expect("get").expect("stored");
    assert_eq!(stale.year, Some(1974));

    Car::edit(&mut session, json!({"id": id, "year": 1975})).expect("edit");
    stale.refresh(&session).expect("refresh");
    assert_eq!(stale.year, Some(1975));

    let err = Car::default().refresh(&session).expect_err("no id");
    assert!(matches!(err, Error::Usage(_)), "{err:?}");
}

#[test]
fn from_dict_changes_memory_until_save() {
    let mut session = session();
    let mut car = Car::add(&mut session, json!({"make": "vw", "model": "golf"})).expect("add");
    car.from_dict(&mut session, json!({"year": 1980})).expect("from_dict");
    assert_eq!(car.year, Some(1980));

    let stored = Car::get(&session, car.id().expect("id")).expect("get").expect("stored");
    assert_eq!(stored.year, None);

    car.save(&mut session).expect("save");
    let stored = Car::get(&session, car.id().expect("id")).expect("get").expect("stored");
    assert_eq!(stored.year, Some(1980));

    let exported = car.to_dict(&["createdts", "updatedts"]);
    assert_eq!(exported["model"], json!("golf"));
    assert_eq!(exported["year"], json!(1980));
    assert!(!exported.contains_key("createdts"));
}
