use serde_json::json;
use sqlbase::prelude::*;

#[derive(Debug, Clone, Default, PartialEq, Record)]
#[record(table = "cars")]
struct Car {
    #[record(meta)]
    meta: RecordMeta,
    #[record(unique)]
    vin: String,
    make: String,
}

fn factory(dir: &tempfile::TempDir) -> SessionFactory {
    let url = format!("sqlite:///{}", dir.path().join("cars.db").display());
    let factory = SessionFactory::new(DbConfig::new(url), sqlbase_sqlite::connect)
        .expect("sqlite factory");
    factory
        .scope(|s| MetaData::new().with::<Car>().create_all(s))
        .expect("create tables");
    factory
}

fn vins(factory: &SessionFactory) -> Vec<String> {
    factory
        .scope(|s| Car::list(s, &[OrderBy::asc("vin")]))
        .expect("list cars")
        .into_iter()
        .map(|c| c.vin)
        .collect()
}

#[test]
fn unit_of_work_commits_as_a_whole() {
    let dir = tempfile::tempdir().expect("tempdir");
    let factory = factory(&dir);

    factory
        .scope(|s| {
            transaction(s, |s| {
                Car::add(s, json!({"vin": "a", "make": "ford"}))?;
                Car::add(s, json!({"vin": "b", "make": "fiat"}))?;
                Ok(())
            })
        })
        .expect("commit");
    assert_eq!(vins(&factory), vec!["a", "b"]);

    let err = factory
        .scope(|s| {
            transaction(s, |s| {
                Car::add(s, json!({"vin": "c", "make": "vw"}))?;
                Car::add(s, json!({"vin": "a", "make": "dup"}))
            })
        })
        .expect_err("duplicate vin");
    assert!(err.is_unique_violation(Dialect::Sqlite, Some("vin")));
    assert_eq!(vins(&factory), vec!["a", "b"], "c was rolled back with the batch");
}

#[test]
fn added_record_matches_a_fresh_read() {
    let dir = tempfile::tempdir().expect("tempdir");
    let factory = factory(&dir);

    let added = factory
        .scope(|s| Car::add(s, json!({"vin": "a", "make": "ford"})))
        .expect("add");
    let id = added.id().expect("id");
    let fetched = factory
        .scope(|s| Car::get(s, id))
        .expect("get")
        .expect("committed");
    assert_eq!(fetched, added);
}

#[test]
fn nested_ignore_unique_keeps_outer_work() {
    let dir = tempfile::tempdir().expect("tempdir");
    let factory = factory(&dir);

    let skipped = factory
        .scope(|s| {
            transaction(s, |s| {
                Car::add(s, json!({"vin": "a", "make": "ford"}))?;
                let dup = ignore_unique(s, &["vin"], |s| Car::add(s, json!({"vin": "a"})))?;
                let dup_iu = Car::add_iu(s, json!({"vin": "a"}))?;
                Car::add(s, json!({"vin": "b", "make": "fiat"}))?;
                Ok(dup.is_none() && dup_iu.is_none())
            })
        })
        .expect("outer commit");
    assert!(skipped);
    assert_eq!(vins(&factory), vec!["a", "b"]);
}

#[test]
fn ignore_unique_propagates_other_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let factory = factory(&dir);

    let err = factory
        .scope(|s| {
            Car::add(s, json!({"vin": "a", "make": "ford"}))?;
            ignore_unique(s, &["make"], |s| Car::add(s, json!({"vin": "a"})))
        })
        .expect_err("vin is not in the ignore list");
    assert!(err.is_unique_violation(Dialect::Sqlite, Some("vin")));

    let err = factory
        .scope(|s| ignore_unique(s, &[], |s| Car::edit(s, json!({"id": 99}))))
        .expect_err("not a uniqueness problem");
    assert!(matches!(err, Error::NoResultFound));
}

#[test]
fn scope_rolls_back_unfinished_work() {
    let dir = tempfile::tempdir().expect("tempdir");
    let factory = factory(&dir);

    factory
        .scope(|s| {
            s.begin()?;
            s.execute("INSERT INTO cars (vin, make) VALUES ('x', 'vw')", &[])?;
            assert!(s.in_transaction());
            Ok(())
        })
        .expect("scope closes cleanly");
    assert!(vins(&factory).is_empty());
}

#[test]
fn one_or_none_maps_only_missing_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let factory = factory(&dir);

    factory
        .scope(|s| {
            Car::add(s, json!({"vin": "a", "make": "ford"}))?;
            Car::add(s, json!({"vin": "b", "make": "ford"}))?;

            let none = one_or_none(|| Car::one(s, Expr::col("make").eq("vw")))?;
            assert!(none.is_none());

            let err = one_or_none(|| Car::one(s, Expr::col("make").eq("ford")))
                .expect_err("two fords");
            assert!(matches!(err, Error::MultipleResultsFound { count: 2 }));
            Ok(())
        })
        .expect("scope");
}
