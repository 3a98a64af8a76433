use serde_json::json;
use sqlbase::prelude::*;
use sqlbase_sqlite::SqliteConnection;

#[derive(Debug, Clone, Default, PartialEq, Record)]
#[record(table = "persons")]
#[record(has_many(name = "cars", target = Car, column = "owner_id"))]
struct Person {
    #[record(meta)]
    meta: RecordMeta,
    #[record(unique)]
    name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
#[record(table = "cars")]
#[record(belongs_to(name = "owner", target = Person, column = "owner_id", on_delete = "cascade"))]
struct Car {
    #[record(meta)]
    meta: RecordMeta,
    make: String,
    owner_id: Option<i64>,
}

fn session() -> Session {
    let conn = SqliteConnection::open_in_memory().expect("open sqlite memory db");
    let mut session = Session::new(Box::new(conn));
    MetaData::new()
        .with::<Car>()
        .with::<Person>()
        .create_all(&mut session)
        .expect("create tables");
    session
}

fn makes_of(session: &Session, owner: &Person) -> Vec<String> {
    Car::list_by(session, &[("owner_id", owner.id().into())], &[OrderBy::asc("make")])
        .expect("list cars")
        .into_iter()
        .map(|c| c.make)
        .collect()
}

#[test]
fn belongs_to_object_creates_parent() {
    let mut session = session();
    let car = Car::add(&mut session, json!({"make": "ford", "owner": {"name": "ann"}}))
        .expect("add car with owner");
    let ann = Person::get_by(&session, &[("name", "ann".into())])
        .expect("get owner")
        .expect("owner stored");
    assert_eq!(car.owner_id, ann.id());
}

#[test]
fn belongs_to_without_id_updates_linked_parent() {
    let mut session = session();
    let car = Car::add(&mut session, json!({"make": "ford", "owner": {"name": "ann"}}))
        .expect("add car");
    let owner_id = car.owner_id;

    let car = Car::edit(&mut session, json!({"id": car.id(), "owner": {"name": "anne"}}))
        .expect("rename owner through car");
    assert_eq!(car.owner_id, owner_id, "same parent, edited in place");
    assert_eq!(Person::count(&session).expect("count"), 1);
    let owner = Person::get(&session, owner_id.expect("owner id"))
        .expect("get")
        .expect("owner");
    assert_eq!(owner.name, "anne");

    let bob = Person::add(&mut session, json!({"name": "bob"})).expect("add bob");
    let car = Car::edit(&mut session, json!({"id": car.id(), "owner": {"id": bob.id()}}))
        .expect("relink to bob");
    assert_eq!(car.owner_id, bob.id());

    let car = Car::edit(&mut session, json!({"id": car.id(), "owner": null})).expect("unlink");
    assert_eq!(car.owner_id, None);

    let err = Car::edit(&mut session, json!({"id": car.id(), "owner": 3})).expect_err("scalar owner");
    assert!(matches!(err, Error::Usage(_)), "{err:?}");
}

#[test]
fn has_many_objects_replace_children() {
    let mut session = session();
    let ann = Person::add(
        &mut session,
        json!({"name": "ann", "cars": [{"make": "ford"}, {"make": "fiat"}]}),
    )
    .expect("add person with cars");
    assert_eq!(makes_of(&session, &ann), vec!["fiat", "ford"]);

    let ford = Car::get_by(&session, &[("make", "ford".into())])
        .expect("get ford")
        .expect("ford");
    Person::edit(
        &mut session,
        json!({"id": ann.id(), "cars": [{"id": ford.id(), "make": "ford t"}, {"make": "vw"}]}),
    )
    .expect("replace cars");
    assert_eq!(makes_of(&session, &ann), vec!["ford t", "vw"]);

    let fiat = Car::get_by(&session, &[("make", "fiat".into())])
        .expect("get fiat")
        .expect("fiat is kept, only unlinked");
    assert_eq!(fiat.owner_id, None);
    assert!(fiat.meta.updatedts.is_some());

    Person::edit(&mut session, json!({"id": ann.id(), "cars": []})).expect("clear cars");
    assert!(makes_of(&session, &ann).is_empty());
    assert_eq!(Car::count(&session).expect("count"), 3);
}

#[test]
fn has_many_ids_link_existing_children() {
    let mut session = session();
    let a = Car::add(&mut session, json!({"make": "a"})).expect("car a");
    let b = Car::add(&mut session, json!({"make": "b"})).expect("car b");
    let ann = Person::add(&mut session, json!({"name": "ann", "cars": [a.id(), b.id()]}))
        .expect("link by id");
    assert_eq!(makes_of(&session, &ann), vec!["a", "b"]);

    Person::edit(&mut session, json!({"id": ann.id(), "cars": [b.id()]})).expect("keep b");
    assert_eq!(makes_of(&session, &ann), vec!["b"]);

    let err = Person::edit(&mut session, json!({"id": ann.id(), "cars": [a.id(), 999]}))
        .expect_err("unknown child id");
    assert!(matches!(err, Error::NoResultFound), "{err:?}");
    assert_eq!(makes_of(&session, &ann), vec!["b"], "failed edit rolled back");

    let err = Person::edit(&mut session, json!({"id": ann.id(), "cars": [a.id(), {"make": "c"}]}))
        .expect_err("mixed list");
    assert!(matches!(err, Error::Usage(_)), "{err:?}");
}

#[test]
fn has_many_ids_may_repeat() {
    let mut session = session();
    let a = Car::add(&mut session, json!({"make": "a"})).expect("car a");
    let b = Car::add(&mut session, json!({"make": "b"})).expect("car b");
    let ann = Person::add(&mut session, json!({"name": "ann", "cars": [a.id()]})).expect("add ann");

    Person::edit(&mut session, json!({"id": ann.id(), "cars": [b.id(), b.id()]}))
        .expect("repeated id links once");
    assert_eq!(makes_of(&session, &ann), vec!["b"]);
}

#[test]
fn add_iu_without_unique_columns_keeps_nested_violations() {
    let mut session = session();
    Person::add(&mut session, json!({"name": "ann"})).expect("add ann");

    let err = Car::add_iu(&mut session, json!({"make": "ford", "owner": {"name": "ann"}}))
        .expect_err("owner name is taken");
    assert!(err.is_unique_violation(Dialect::Sqlite, Some("name")), "{err:?}");
    assert_eq!(Car::count(&session).expect("count"), 0);

    let err = ignore_unique(&mut session, &[], |s| Person::add(s, json!({"name": "ann"})))
        .expect_err("empty field list ignores nothing");
    assert!(err.is_unique_violation(Dialect::Sqlite, Some("name")), "{err:?}");
    assert_eq!(Person::count(&session).expect("count"), 1);
}

#[test]
fn has_many_needs_a_stored_parent() {
    let mut session = session();
    let mut draft = Person {
        name: "ann".to_string(),
        ..Person::default()
    };
    let err = draft
        .from_dict(&mut session, json!({"cars": [{"make": "ford"}]}))
        .expect_err("unsaved parent");
    assert!(matches!(err, Error::Usage(_)), "{err:?}");

    draft.save(&mut session).expect("save person");
    draft
        .from_dict(&mut session, json!({"cars": [{"make": "ford"}]}))
        .expect("saved parent");
    assert_eq!(makes_of(&session, &draft), vec!["ford"]);
}

#[test]
fn relationships_are_not_columns() {
    let mut session = session();
    let err = Person::count_by(&session, &[("cars", Value::Null)]).expect_err("not a column");
    assert!(matches!(err, Error::Usage(_)), "{err:?}");

    let ann = Person::add(&mut session, json!({"name": "ann", "cars": [{"make": "ford"}]}))
        .expect("add");
    let dict = ann.to_dict(&[]);
    assert!(!dict.contains_key("cars"));

    Person::delete(&mut session, ann.id().expect("id")).expect("delete person");
    assert_eq!(Car::count(&session).expect("count"), 0, "ON DELETE CASCADE");
}
