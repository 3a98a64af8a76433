//! Generic data access for every record type.
//!
//! [`Declarative`] is implemented for all [`Record`] types. Write operations
//! take input as a JSON object and run inside [`transaction`], so they nest
//! into an enclosing unit of work as a savepoint. Read operations take a
//! shared session and never open a transaction of their own.
//!
//! Input keys are column names or relationship names:
//!
//! - a belongs-to relationship takes an object (the parent, inserted or
//!   updated and linked through the foreign key) or `null` (unlink)
//! - a has-many relationship takes a list of objects (children upserted and
//!   linked) or a list of ids (existing children linked). Children linked
//!   before but missing from the list have their foreign key set to NULL.

use chrono::{Local, NaiveDateTime};
use serde_json::Value as JsonValue;
use sqlbase_core::{
    Dict, Error, Record, RelatedVisitor, RelationshipInfo, RelationshipKind, Result, Row, Value,
};
use sqlbase_query::{Count, Delete, Expr, Insert, OrderBy, Select, Update};
use sqlbase_session::{Session, ignore_unique, one_or_none, transaction};

/// Create, read, update and delete operations shared by all record types.
///
/// # Example
///
/// ```ignore
/// let car = Car::add(&mut session, json!({"make": "ford", "model": "t"}))?;
/// let car = Car::edit(&mut session, json!({"id": car.id(), "year": 1927}))?;
/// let fords = Car::list_by(&session, &[("make", "ford".into())], &[OrderBy::desc("year")])?;
/// ```
pub trait Declarative: Record {
    /// Insert a record built from `data` and return it as stored.
    #[tracing::instrument(level = "debug", skip_all, fields(table = Self::TABLE_NAME))]
    fn add(session: &mut Session, data: JsonValue) -> Result<Self> {
        let dict = as_dict::<Self>(&data)?;
        transaction(session, |s| add_in::<Self>(s, dict))
    }

    /// Like [`add`](Self::add), but returns `None` instead of failing when the
    /// insert violates a unique constraint of this record type.
    ///
    /// Violations on other tables, such as a nested parent record, propagate.
    /// A type without unique columns behaves exactly like `add`.
    #[tracing::instrument(level = "debug", skip_all, fields(table = Self::TABLE_NAME))]
    fn add_iu(session: &mut Session, data: JsonValue) -> Result<Option<Self>> {
        let dict = as_dict::<Self>(&data)?;
        let unique = Self::unique_columns();
        ignore_unique(session, &unique, |s| add_in::<Self>(s, dict))
    }

    /// Update the record whose id is given in `data`.
    ///
    /// Fails with [`Error::Usage`] when `data` has no id and with
    /// [`Error::NoResultFound`] when no record has it.
    #[tracing::instrument(level = "debug", skip_all, fields(table = Self::TABLE_NAME))]
    fn edit(session: &mut Session, data: JsonValue) -> Result<Self> {
        let dict = as_dict::<Self>(&data)?;
        let id = data_id::<Self>(dict)?.ok_or_else(|| {
            Error::usage(format!("editing \"{}\" requires an id", Self::TABLE_NAME))
        })?;
        transaction(session, |s| edit_in::<Self>(s, id, dict))
    }

    /// [`edit`](Self::edit) when `data` carries an id, [`add`](Self::add)
    /// otherwise.
    #[tracing::instrument(level = "debug", skip_all, fields(table = Self::TABLE_NAME))]
    fn update(session: &mut Session, data: JsonValue) -> Result<Self> {
        let dict = as_dict::<Self>(&data)?;
        transaction(session, |s| update_in::<Self>(s, dict))
    }

    /// Delete the record with `id`. Returns whether a row was deleted.
    #[tracing::instrument(level = "debug", skip(session), fields(table = Self::TABLE_NAME))]
    fn delete(session: &mut Session, id: i64) -> Result<bool> {
        let deleted = transaction(session, |s| {
            Delete::<Self>::new().filter(Expr::col("id").eq(id)).execute(&*s)
        })?;
        Ok(deleted > 0)
    }

    /// Delete every record matching `expr`.
    #[tracing::instrument(level = "debug", skip_all, fields(table = Self::TABLE_NAME))]
    fn delete_where(session: &mut Session, expr: Expr) -> Result<u64> {
        check_expr::<Self>(&expr)?;
        transaction(session, |s| Delete::<Self>::new().filter(expr).execute(&*s))
    }

    /// Delete every record of this type.
    #[tracing::instrument(level = "debug", skip_all, fields(table = Self::TABLE_NAME))]
    fn delete_all(session: &mut Session) -> Result<u64> {
        transaction(session, |s| Delete::<Self>::new().execute(&*s))
    }

    /// Assign columns and relationships from `data` to this record.
    ///
    /// Related records are written at once. This record's own columns only
    /// change in memory until [`save`](Self::save). A has-many relationship
    /// needs the record to have an id.
    fn from_dict(&mut self, session: &mut Session, data: JsonValue) -> Result<()> {
        let dict = as_dict::<Self>(&data)?;
        let parts = Parts::split::<Self>(dict);
        if !parts.children.is_empty() && self.id().is_none() {
            return Err(Error::usage(format!(
                "\"{}\" must be saved before has-many relationships can be assigned",
                Self::TABLE_NAME
            )));
        }
        transaction(session, |s| {
            let mut record = self.clone();
            record.assign(&parts.columns)?;
            apply_parents(&mut record, s, &parts.parents)?;
            apply_children(&record, s, &parts.children)?;
            *self = record;
            Ok(())
        })
    }

    /// Write this record: insert it when it has no id, update it otherwise.
    /// The record is reloaded afterwards.
    #[tracing::instrument(level = "debug", skip_all, fields(table = Self::TABLE_NAME, id = ?self.id()))]
    fn save(&mut self, session: &mut Session) -> Result<()> {
        transaction(session, |s| {
            let id = match self.id() {
                Some(id) => {
                    let mut record = self.clone();
                    record.meta_mut().updatedts = Some(now());
                    if Update::for_record(&record)?.execute(&*s)? == 0 {
                        return Err(Error::NoResultFound);
                    }
                    id
                }
                None => Insert::new(&*self).execute(&*s)?,
            };
            *self = load::<Self>(s, id)?;
            Ok(())
        })
    }

    /// Reload this record from storage.
    fn refresh(&mut self, session: &Session) -> Result<()> {
        let id = self.id().ok_or_else(|| {
            Error::usage(format!(
                "cannot refresh a \"{}\" record that has no id",
                Self::TABLE_NAME
            ))
        })?;
        *self = load::<Self>(session, id)?;
        Ok(())
    }

    /// The record with `id`, if any.
    fn get(session: &Session, id: i64) -> Result<Option<Self>> {
        one_or_none(|| load::<Self>(session, id))
    }

    /// The one record whose columns equal `criteria`, if any.
    ///
    /// More than one match is [`Error::MultipleResultsFound`].
    fn get_by(session: &Session, criteria: &[(&str, Value)]) -> Result<Option<Self>> {
        let select = select::<Self>(criteria_filter::<Self>(criteria)?, &[])?;
        one_or_none(|| select.one(session))
    }

    /// The one record matching `expr`, if any.
    fn get_where(session: &Session, expr: Expr) -> Result<Option<Self>> {
        let select = select::<Self>(Some(expr), &[])?;
        one_or_none(|| select.one(session))
    }

    /// The one record matching `expr`.
    ///
    /// Zero matches is [`Error::NoResultFound`], more than one is
    /// [`Error::MultipleResultsFound`].
    fn one(session: &Session, expr: Expr) -> Result<Self> {
        select::<Self>(Some(expr), &[])?.one(session)
    }

    /// The first record in `order_by` order (id ascending when empty).
    fn first(session: &Session, order_by: &[OrderBy]) -> Result<Option<Self>> {
        select::<Self>(None, order_by)?.first(session)
    }

    /// The first record whose columns equal `criteria`.
    fn first_by(
        session: &Session,
        criteria: &[(&str, Value)],
        order_by: &[OrderBy],
    ) -> Result<Option<Self>> {
        select::<Self>(criteria_filter::<Self>(criteria)?, order_by)?.first(session)
    }

    /// The first record matching `expr`.
    fn first_where(session: &Session, expr: Expr, order_by: &[OrderBy]) -> Result<Option<Self>> {
        select::<Self>(Some(expr), order_by)?.first(session)
    }

    /// Every record.
    fn list(session: &Session, order_by: &[OrderBy]) -> Result<Vec<Self>> {
        select::<Self>(None, order_by)?.all(session)
    }

    /// Every record whose columns equal `criteria`.
    fn list_by(
        session: &Session,
        criteria: &[(&str, Value)],
        order_by: &[OrderBy],
    ) -> Result<Vec<Self>> {
        select::<Self>(criteria_filter::<Self>(criteria)?, order_by)?.all(session)
    }

    /// Every record matching `expr`.
    fn list_where(session: &Session, expr: Expr, order_by: &[OrderBy]) -> Result<Vec<Self>> {
        select::<Self>(Some(expr), order_by)?.all(session)
    }

    /// `(key, value)` column pairs of every record.
    fn pairs(
        session: &Session,
        key: &str,
        value: &str,
        order_by: &[OrderBy],
    ) -> Result<Vec<(Value, Value)>> {
        pairs_in::<Self>(session, key, value, None, order_by)
    }

    /// `(key, value)` column pairs of records whose columns equal `criteria`.
    fn pairs_by(
        session: &Session,
        key: &str,
        value: &str,
        criteria: &[(&str, Value)],
        order_by: &[OrderBy],
    ) -> Result<Vec<(Value, Value)>> {
        pairs_in::<Self>(session, key, value, criteria_filter::<Self>(criteria)?, order_by)
    }

    /// `(key, value)` column pairs of records matching `expr`.
    fn pairs_where(
        session: &Session,
        key: &str,
        value: &str,
        expr: Expr,
        order_by: &[OrderBy],
    ) -> Result<Vec<(Value, Value)>> {
        pairs_in::<Self>(session, key, value, Some(expr), order_by)
    }

    /// Number of records.
    fn count(session: &Session) -> Result<u64> {
        Count::<Self>::new().execute(session)
    }

    /// Number of records whose columns equal `criteria`.
    fn count_by(session: &Session, criteria: &[(&str, Value)]) -> Result<u64> {
        let mut count = Count::<Self>::new();
        if let Some(filter) = criteria_filter::<Self>(criteria)? {
            count = count.filter(filter);
        }
        count.execute(session)
    }

    /// Number of records matching `expr`.
    fn count_where(session: &Session, expr: Expr) -> Result<u64> {
        check_expr::<Self>(&expr)?;
        Count::<Self>::new().filter(expr).execute(session)
    }
}

impl<M: Record> Declarative for M {}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn as_dict<M: Record>(data: &JsonValue) -> Result<&Dict> {
    data.as_object().ok_or_else(|| {
        Error::usage(format!(
            "data for \"{}\" must be a JSON object, got {data}",
            M::TABLE_NAME
        ))
    })
}

/// The `id` in `data`, if present and not null.
fn data_id<M: Record>(data: &Dict) -> Result<Option<i64>> {
    match data.get("id") {
        None | Some(JsonValue::Null) => Ok(None),
        Some(JsonValue::Number(n)) => n.as_i64().map(Some).ok_or_else(|| bad_id::<M>(n)),
        Some(JsonValue::String(s)) => s.trim().parse().map(Some).map_err(|_| bad_id::<M>(s)),
        Some(other) => Err(bad_id::<M>(other)),
    }
}

fn bad_id<M: Record>(id: impl std::fmt::Display) -> Error {
    Error::usage(format!("{id} is not a valid id for \"{}\"", M::TABLE_NAME))
}

fn check_columns<'a, M: Record>(columns: impl IntoIterator<Item = &'a str>) -> Result<()> {
    for column in columns {
        if M::field(column).is_none() {
            return Err(Error::unknown_field(M::TABLE_NAME, column));
        }
    }
    Ok(())
}

fn check_expr<M: Record>(expr: &Expr) -> Result<()> {
    check_columns::<M>(expr.columns())
}

fn criteria_filter<M: Record>(criteria: &[(&str, Value)]) -> Result<Option<Expr>> {
    check_columns::<M>(criteria.iter().map(|(column, _)| *column))?;
    Ok(Expr::all_eq(criteria))
}

fn select<M: Record>(filter: Option<Expr>, order_by: &[OrderBy]) -> Result<Select<M>> {
    check_columns::<M>(order_by.iter().map(|o| o.column.as_str()))?;
    let mut select = Select::<M>::new().order_by_all(order_by);
    if let Some(filter) = filter {
        check_expr::<M>(&filter)?;
        select = select.filter(filter);
    }
    Ok(select)
}

fn load<M: Record>(session: &Session, id: i64) -> Result<M> {
    Select::<M>::new().filter(Expr::col("id").eq(id)).one(session)
}

fn pairs_in<M: Record>(
    session: &Session,
    key: &str,
    value: &str,
    filter: Option<Expr>,
    order_by: &[OrderBy],
) -> Result<Vec<(Value, Value)>> {
    check_columns::<M>([key, value])?;
    let rows = select::<M>(filter, order_by)?.rows(session)?;
    rows.iter()
        .map(|row| Ok((column_value(row, key)?, column_value(row, value)?)))
        .collect()
}

fn column_value(row: &Row, column: &str) -> Result<Value> {
    row.get_named(column)
        .cloned()
        .ok_or_else(|| Error::conversion(column, "column missing from result row"))
}

/// Input data split into plain columns and relationship values.
struct Parts<'a> {
    columns: Dict,
    parents: Vec<(&'static RelationshipInfo, &'a JsonValue)>,
    children: Vec<(&'static RelationshipInfo, &'a JsonValue)>,
}

impl<'a> Parts<'a> {
    fn split<M: Record>(data: &'a Dict) -> Self {
        let mut parts = Self {
            columns: Dict::new(),
            parents: Vec::new(),
            children: Vec::new(),
        };
        for (key, json) in data {
            match M::relationship(key) {
                Some(rel) if rel.kind == RelationshipKind::BelongsTo => parts.parents.push((rel, json)),
                Some(rel) => parts.children.push((rel, json)),
                None => {
                    parts.columns.insert(key.clone(), json.clone());
                }
            }
        }
        parts
    }
}

fn add_in<M: Record>(session: &mut Session, data: &Dict) -> Result<M> {
    let parts = Parts::split::<M>(data);
    let mut record = M::default();
    record.assign(&parts.columns)?;
    apply_parents(&mut record, session, &parts.parents)?;
    let id = Insert::new(&record).execute(&*session)?;
    record.meta_mut().id = Some(id);
    apply_children(&record, session, &parts.children)?;
    load(session, id)
}

fn edit_in<M: Record>(session: &mut Session, id: i64, data: &Dict) -> Result<M> {
    let mut record: M = load(session, id)?;
    let parts = Parts::split::<M>(data);
    record.assign(&parts.columns)?;
    apply_parents(&mut record, session, &parts.parents)?;
    record.meta_mut().updatedts = Some(now());
    Update::for_record(&record)?.execute(&*session)?;
    apply_children(&record, session, &parts.children)?;
    load(session, id)
}

fn update_in<M: Record>(session: &mut Session, data: &Dict) -> Result<M> {
    match data_id::<M>(data)? {
        Some(id) => edit_in(session, id, data),
        None => add_in(session, data),
    }
}

fn unrouted<M: Record>(name: &str) -> Error {
    Error::usage(format!(
        "relationship \"{name}\" of \"{}\" has no related type",
        M::TABLE_NAME
    ))
}

fn apply_parents<M: Record>(
    record: &mut M,
    session: &mut Session,
    parents: &[(&'static RelationshipInfo, &JsonValue)],
) -> Result<()> {
    for (rel, json) in parents {
        let fk = match json {
            JsonValue::Null => Value::Null,
            JsonValue::Object(data) => {
                let current = record.get_value(rel.column).and_then(|v| v.as_i64());
                let visitor = UpsertParent {
                    session: &mut *session,
                    data,
                    current,
                };
                let id = M::visit_related(rel.name, visitor).ok_or_else(|| unrouted::<M>(rel.name))??;
                Value::BigInt(id)
            }
            other => {
                return Err(Error::usage(format!(
                    "relationship \"{}\" expects an object or null, got {other}",
                    rel.name
                )));
            }
        };
        record.set_value(rel.column, fk)?;
    }
    Ok(())
}

/// Inserts or updates the parent of a belongs-to relationship.
///
/// Data without an id updates the currently linked parent in place, if any.
struct UpsertParent<'a> {
    session: &'a mut Session,
    data: &'a Dict,
    current: Option<i64>,
}

impl RelatedVisitor for UpsertParent<'_> {
    type Output = Result<i64>;

    fn visit<R: Record>(self) -> Result<i64> {
        let parent: R = match (data_id::<R>(self.data)?, self.current) {
            (None, Some(current)) => edit_in(self.session, current, self.data)?,
            _ => update_in(self.session, self.data)?,
        };
        parent
            .id()
            .ok_or_else(|| Error::database(format!("\"{}\" was stored without an id", R::TABLE_NAME)))
    }
}

/// Members of a has-many list: all objects or all ids.
enum Members<'a> {
    Objects(Vec<&'a Dict>),
    Ids(Vec<i64>),
}

impl<'a> Members<'a> {
    fn parse(rel: &RelationshipInfo, json: &'a JsonValue) -> Result<Self> {
        let mixed = || {
            Error::usage(format!(
                "relationship \"{}\" expects a list of objects or a list of ids",
                rel.name
            ))
        };
        let items = json.as_array().ok_or_else(mixed)?;
        if items.iter().all(JsonValue::is_object) {
            return Ok(Self::Objects(items.iter().filter_map(JsonValue::as_object).collect()));
        }
        items
            .iter()
            .map(|item| item.as_i64().ok_or_else(mixed))
            .collect::<Result<Vec<_>>>()
            .map(Self::Ids)
    }
}

fn apply_children<M: Record>(
    record: &M,
    session: &mut Session,
    children: &[(&'static RelationshipInfo, &JsonValue)],
) -> Result<()> {
    if children.is_empty() {
        return Ok(());
    }
    let parent_id = record.id().ok_or_else(|| {
        Error::usage(format!(
            "\"{}\" has no id to link has-many relationships to",
            M::TABLE_NAME
        ))
    })?;
    for (rel, json) in children {
        let members = Members::parse(rel, json)?;
        let visitor = ReplaceChildren {
            session: &mut *session,
            parent_id,
            column: rel.column,
            members,
        };
        M::visit_related(rel.name, visitor).ok_or_else(|| unrouted::<M>(rel.name))??;
    }
    Ok(())
}

/// Makes the listed records the complete set of children of one parent.
struct ReplaceChildren<'a> {
    session: &'a mut Session,
    parent_id: i64,
    column: &'static str,
    members: Members<'a>,
}

impl RelatedVisitor for ReplaceChildren<'_> {
    type Output = Result<()>;

    fn visit<R: Record>(self) -> Result<()> {
        let Self {
            session,
            parent_id,
            column,
            members,
        } = self;
        let keep = match members {
            Members::Objects(items) => {
                let mut keep = Vec::with_capacity(items.len());
                for item in items {
                    let mut data = item.clone();
                    data.insert(column.to_string(), JsonValue::from(parent_id));
                    let child: R = update_in(session, &data)?;
                    keep.extend(child.id());
                }
                keep
            }
            Members::Ids(mut ids) => {
                ids.sort_unstable();
                ids.dedup();
                if !ids.is_empty() {
                    let linked = Update::<R>::new()
                        .set(column, parent_id)
                        .set("updatedts", now())
                        .filter(Expr::col("id").in_list(ids.iter().copied()))
                        .execute(&*session)?;
                    if linked < ids.len() as u64 {
                        return Err(Error::NoResultFound);
                    }
                }
                ids
            }
        };

        let mut stale = Update::<R>::new()
            .set(column, Value::Null)
            .set("updatedts", now())
            .filter(Expr::col(column).eq(parent_id));
        if !keep.is_empty() {
            stale = stale.filter(Expr::col("id").not_in(keep));
        }
        let unlinked = stale.execute(&*session)?;
        tracing::debug!(
            table = R::TABLE_NAME,
            parent_id,
            unlinked,
            "Replaced has-many children"
        );
        Ok(())
    }
}
