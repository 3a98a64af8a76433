//! SQL Server schema dump.
//!
//! Writes one script per user object, reconstructed from the system catalog,
//! so the files can be kept under version control and replayed with
//! [`SqlScripts`](crate::SqlScripts):
//!
//! ```text
//! <dump>/tables/<table>.sql
//! <dump>/tables/<table>_trg_<trigger>.sql
//! <dump>/views/<view>.sql
//! <dump>/sps/<procedure>.sql
//! <dump>/functions/<function>.sql
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use sqlbase_core::{
    Connection, Dialect, Error, ReferentialAction, Result, Row, TIMESTAMP_FORMAT, Value,
    quote_ident_mssql,
};
use sqlbase_session::Session;

use crate::scripts::STATEMENT_BREAK;

/// Folders recreated on every dump.
pub const DUMP_FOLDERS: [&str; 4] = ["tables", "views", "sps", "functions"];

const OBJECTS_SQL: &str = "SELECT o.object_id, o.name, o.type, o.create_date, o.modify_date \
     FROM sys.objects o \
     WHERE o.type IN ('U', 'V', 'P', 'FN', 'IF', 'TF') AND o.is_ms_shipped = 0";

const CHILD_OBJECTS_SQL: &str = "SELECT o.object_id, o.name, o.type, o.create_date, o.modify_date \
     FROM sys.objects o \
     WHERE o.parent_object_id = @P1 AND o.type = @P2 \
     ORDER BY o.name";

const MODULE_SQL: &str = "SELECT m.uses_ansi_nulls, m.uses_quoted_identifier, m.definition \
     FROM sys.sql_modules m \
     WHERE m.object_id = @P1";

const SCHEMA_SQL: &str = "SELECT s.name AS schema_name \
     FROM sys.objects o \
     JOIN sys.schemas s ON s.schema_id = o.schema_id \
     WHERE o.object_id = @P1";

const COLUMNS_SQL: &str = "SELECT c.name, t.name AS type_name, c.max_length, c.precision, c.scale, \
            c.is_nullable, c.is_identity \
     FROM sys.columns c \
     JOIN sys.types t ON t.user_type_id = c.user_type_id \
     WHERE c.object_id = @P1 \
     ORDER BY c.column_id";

const PRIMARY_KEY_SQL: &str = "SELECT i.name AS index_name, c.name AS column_name, ic.is_descending_key \
     FROM sys.indexes i \
     JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id \
     JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id \
     WHERE i.object_id = @P1 AND i.is_primary_key = 1 \
     ORDER BY ic.key_ordinal";

const FOREIGN_KEYS_SQL: &str = "SELECT fk.name, pc.name AS column_name, rs.name AS ref_schema, \
            rt.name AS ref_table, rc.name AS ref_column, \
            fk.delete_referential_action_desc, fk.update_referential_action_desc \
     FROM sys.foreign_keys fk \
     JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id \
     JOIN sys.columns pc ON pc.object_id = fkc.parent_object_id AND pc.column_id = fkc.parent_column_id \
     JOIN sys.tables rt ON rt.object_id = fkc.referenced_object_id \
     JOIN sys.schemas rs ON rs.schema_id = rt.schema_id \
     JOIN sys.columns rc ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id \
     WHERE fk.parent_object_id = @P1 \
     ORDER BY fk.name, fkc.constraint_column_id";

const UNIQUE_INDEX_SQL: &str = "SELECT i.type_desc, ds.name AS data_space, c.name AS column_name, \
            ic.is_descending_key \
     FROM sys.indexes i \
     JOIN sys.data_spaces ds ON ds.data_space_id = i.data_space_id \
     JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id \
     JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id \
     WHERE i.object_id = @P1 AND i.name = @P2 \
     ORDER BY ic.key_ordinal";

/// Kind of catalog object, from `sys.objects.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// `U`
    Table,
    /// `V`
    View,
    /// `P`
    Procedure,
    /// `FN`, `IF`, `TF`
    Function,
    /// `TR`
    Trigger,
    /// `UQ`
    UniqueConstraint,
}

impl ObjectKind {
    /// Parse a `sys.objects.type` code. The column is `CHAR(2)`, so trailing
    /// blanks are ignored.
    pub fn from_code(code: &str) -> Result<Self> {
        match code.trim() {
            "U" => Ok(ObjectKind::Table),
            "V" => Ok(ObjectKind::View),
            "P" => Ok(ObjectKind::Procedure),
            "FN" | "IF" | "TF" => Ok(ObjectKind::Function),
            "TR" => Ok(ObjectKind::Trigger),
            "UQ" => Ok(ObjectKind::UniqueConstraint),
            other => Err(Error::usage(format!("object type \"{other}\" not supported"))),
        }
    }

    /// Folder the object's script is written to.
    pub const fn folder(self) -> &'static str {
        match self {
            ObjectKind::Table | ObjectKind::Trigger | ObjectKind::UniqueConstraint => "tables",
            ObjectKind::View => "views",
            ObjectKind::Procedure => "sps",
            ObjectKind::Function => "functions",
        }
    }
}

/// One row of `sys.objects`.
#[derive(Debug, Clone)]
pub struct CatalogObject {
    pub object_id: i64,
    pub name: String,
    pub kind: ObjectKind,
    pub create_date: String,
    pub modify_date: String,
}

impl CatalogObject {
    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            object_id: row.get_as("object_id")?,
            name: row.get_as("name")?,
            kind: ObjectKind::from_code(&row.get_as::<String>("type")?)?,
            create_date: display_date(row.get_named("create_date")),
            modify_date: display_date(row.get_named("modify_date")),
        })
    }
}

fn display_date(value: Option<&Value>) -> String {
    match value {
        Some(Value::Timestamp(ts)) => ts.format(TIMESTAMP_FORMAT).to_string(),
        Some(Value::Text(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => format!("{other:?}"),
    }
}

/// Body of a view, procedure, function or trigger, from `sys.sql_modules`.
#[derive(Debug, Clone, Default)]
struct Module {
    definition: Option<String>,
    ansi_nulls: bool,
    quoted_identifier: bool,
}

/// Render the script written for one object.
pub fn file_output(
    object: &CatalogObject,
    ansi_nulls: bool,
    quoted_identifier: bool,
    ddl: &str,
) -> String {
    let mut lines = vec![
        format!("-- created: {}", object.create_date),
        format!("-- last updated: {}", object.modify_date),
        String::new(),
    ];
    if ansi_nulls {
        lines.push(STATEMENT_BREAK.to_string());
        lines.push("SET ANSI_NULLS ON".to_string());
    }
    if quoted_identifier {
        lines.push(STATEMENT_BREAK.to_string());
        lines.push("SET QUOTED_IDENTIFIER ON".to_string());
    }
    lines.push(String::new());
    lines.push(STATEMENT_BREAK.to_string());
    lines.push(ddl.to_string());
    lines.join("\n")
}

/// Map a catalog referential action (`SET_NULL`) to DDL text, or `None` for
/// `NO_ACTION`.
pub fn referential_action(desc: &str) -> Option<String> {
    match ReferentialAction::from_str(desc) {
        Some(ReferentialAction::NoAction) => None,
        Some(action) => Some(action.as_sql().to_string()),
        None => Some(desc.replace('_', " ")),
    }
}

/// Column type text from `sys.types` plus length, precision and scale.
pub fn column_type(type_name: &str, max_length: i64, precision: i64, scale: i64) -> String {
    let lower = type_name.to_ascii_lowercase();
    let upper = type_name.to_ascii_uppercase();
    let len = |chars: i64| {
        if max_length == -1 {
            "MAX".to_string()
        } else {
            chars.to_string()
        }
    };
    match lower.as_str() {
        "varchar" | "char" | "varbinary" | "binary" => format!("{upper}({})", len(max_length)),
        "nvarchar" | "nchar" => format!("{upper}({})", len(max_length / 2)),
        "decimal" | "numeric" => format!("{upper}({precision}, {scale})"),
        "datetime2" | "datetimeoffset" | "time" => format!("{upper}({scale})"),
        _ => upper,
    }
}

#[derive(Debug)]
struct ForeignKey {
    name: String,
    columns: Vec<String>,
    ref_schema: String,
    ref_table: String,
    ref_columns: Vec<String>,
    on_delete: Option<String>,
    on_update: Option<String>,
}

/// Writes DDL scripts for every user object of a SQL Server database.
#[derive(Debug, Clone)]
pub struct MssqlDdlWriter {
    dump_path: PathBuf,
    names: Vec<String>,
}

impl MssqlDdlWriter {
    /// Writer dumping into `dump_path`.
    pub fn new(dump_path: impl Into<PathBuf>) -> Self {
        Self {
            dump_path: dump_path.into(),
            names: Vec::new(),
        }
    }

    /// Only dump objects with these names.
    #[must_use]
    pub fn only<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Root of the dump.
    pub fn dump_path(&self) -> &Path {
        &self.dump_path
    }

    /// Clear the dump folders and write one script per object.
    ///
    /// Returns the paths written, in order.
    #[tracing::instrument(level = "debug", skip(self, session), fields(dump_path = %self.dump_path.display()))]
    pub fn write_all(&self, session: &Session) -> Result<Vec<PathBuf>> {
        if session.dialect() != Dialect::Mssql {
            return Err(Error::config(format!(
                "schema dumps need an MSSQL database, not {}",
                session.dialect()
            )));
        }

        for folder in DUMP_FOLDERS {
            let target = self.dump_path.join(folder);
            if target.is_dir() {
                fs::remove_dir_all(&target)?;
            }
            fs::create_dir_all(&target)?;
        }

        let mut written = Vec::new();
        for object in self.list_objects(session)? {
            tracing::info!(name = %object.name, kind = ?object.kind, "Writing DDL");
            written.push(self.write_object(session, &object, None)?);
            if object.kind == ObjectKind::Table {
                for trigger in child_objects(session, object.object_id, "TR")? {
                    written.push(self.write_object(session, &trigger, Some(&object.name))?);
                }
            }
        }
        Ok(written)
    }

    fn list_objects(&self, session: &Session) -> Result<Vec<CatalogObject>> {
        let mut sql = OBJECTS_SQL.to_string();
        let mut params = Vec::with_capacity(self.names.len());
        if !self.names.is_empty() {
            let placeholders: Vec<String> = (1..=self.names.len())
                .map(|i| Dialect::Mssql.placeholder(i))
                .collect();
            sql.push_str(&format!(" AND o.name IN ({})", placeholders.join(", ")));
            params.extend(self.names.iter().map(|n| Value::Text(n.clone())));
        }
        sql.push_str(" ORDER BY o.name");
        session
            .query(&sql, &params)?
            .iter()
            .map(CatalogObject::from_row)
            .collect()
    }

    fn write_object(
        &self,
        session: &Session,
        object: &CatalogObject,
        parent_table: Option<&str>,
    ) -> Result<PathBuf> {
        let module = load_module(session, object.object_id)?;
        let ddl = match object.kind {
            ObjectKind::Table => table_ddl(session, object)?,
            _ => module.definition.clone().unwrap_or_default(),
        };
        let file_name = match parent_table {
            Some(table) => format!("{table}_trg_{}.sql", object.name),
            None => format!("{}.sql", object.name),
        };
        let path = self.dump_path.join(object.kind.folder()).join(file_name);
        let output = file_output(object, module.ansi_nulls, module.quoted_identifier, &ddl);
        fs::write(&path, output)?;
        Ok(path)
    }
}

fn child_objects(session: &Session, parent_id: i64, code: &str) -> Result<Vec<CatalogObject>> {
    session
        .query(CHILD_OBJECTS_SQL, &[Value::BigInt(parent_id), Value::from(code)])?
        .iter()
        .map(CatalogObject::from_row)
        .collect()
}

fn load_module(session: &Session, object_id: i64) -> Result<Module> {
    let Some(row) = session.query_one(MODULE_SQL, &[Value::BigInt(object_id)])? else {
        return Ok(Module::default());
    };
    Ok(Module {
        definition: row.get_as("definition")?,
        ansi_nulls: row.get_as::<Option<bool>>("uses_ansi_nulls")?.unwrap_or(false),
        quoted_identifier: row
            .get_as::<Option<bool>>("uses_quoted_identifier")?
            .unwrap_or(false),
    })
}

fn schema_name(session: &Session, object_id: i64) -> Result<String> {
    match session.query_one(SCHEMA_SQL, &[Value::BigInt(object_id)])? {
        Some(row) => row.get_as("schema_name"),
        None => Ok("dbo".to_string()),
    }
}

fn key_column(row: &Row) -> Result<String> {
    let name: String = row.get_as("column_name")?;
    let desc: bool = row.get_as("is_descending_key")?;
    Ok(format!(
        "{} {}",
        quote_ident_mssql(&name),
        if desc { "DESC" } else { "ASC" }
    ))
}

fn load_foreign_keys(session: &Session, object_id: i64) -> Result<Vec<ForeignKey>> {
    let mut keys: Vec<ForeignKey> = Vec::new();
    for row in session.query(FOREIGN_KEYS_SQL, &[Value::BigInt(object_id)])? {
        let name: String = row.get_as("name")?;
        let column: String = row.get_as("column_name")?;
        let ref_column: String = row.get_as("ref_column")?;
        if let Some(fk) = keys.last_mut().filter(|fk| fk.name == name) {
            fk.columns.push(column);
            fk.ref_columns.push(ref_column);
            continue;
        }
        keys.push(ForeignKey {
            name,
            columns: vec![column],
            ref_schema: row.get_as("ref_schema")?,
            ref_table: row.get_as("ref_table")?,
            ref_columns: vec![ref_column],
            on_delete: referential_action(&row.get_as::<String>("delete_referential_action_desc")?),
            on_update: referential_action(&row.get_as::<String>("update_referential_action_desc")?),
        });
    }
    Ok(keys)
}

fn quoted_list(names: &[String]) -> String {
    names
        .iter()
        .map(|n| quote_ident_mssql(n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `CREATE TABLE` for a table, followed by its unique constraints.
fn table_ddl(session: &Session, table: &CatalogObject) -> Result<String> {
    let schema = schema_name(session, table.object_id)?;
    let qualified = format!(
        "{}.{}",
        quote_ident_mssql(&schema),
        quote_ident_mssql(&table.name)
    );
    let id = [Value::BigInt(table.object_id)];

    let mut parts = Vec::new();
    for row in session.query(COLUMNS_SQL, &id)? {
        let name: String = row.get_as("name")?;
        let type_name: String = row.get_as("type_name")?;
        let mut col = format!(
            "{} {}",
            quote_ident_mssql(&name),
            column_type(
                &type_name,
                row.get_as("max_length")?,
                row.get_as("precision")?,
                row.get_as("scale")?,
            )
        );
        if row.get_as::<bool>("is_identity")? {
            col.push_str(" IDENTITY(1,1)");
        }
        col.push_str(if row.get_as::<bool>("is_nullable")? {
            " NULL"
        } else {
            " NOT NULL"
        });
        parts.push(col);
    }

    let pk_rows = session.query(PRIMARY_KEY_SQL, &id)?;
    if let Some(first) = pk_rows.first() {
        let pk_name: String = first.get_as("index_name")?;
        let cols = pk_rows.iter().map(key_column).collect::<Result<Vec<_>>>()?;
        parts.push(format!(
            "CONSTRAINT {} PRIMARY KEY ({})",
            quote_ident_mssql(&pk_name),
            cols.join(", ")
        ));
    }

    for fk in load_foreign_keys(session, table.object_id)? {
        let mut sql = format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}.{} ({})",
            quote_ident_mssql(&fk.name),
            quoted_list(&fk.columns),
            quote_ident_mssql(&fk.ref_schema),
            quote_ident_mssql(&fk.ref_table),
            quoted_list(&fk.ref_columns),
        );
        if let Some(action) = &fk.on_delete {
            sql.push_str(&format!(" ON DELETE {action}"));
        }
        if let Some(action) = &fk.on_update {
            sql.push_str(&format!(" ON UPDATE {action}"));
        }
        parts.push(sql);
    }

    let mut ddl = format!("CREATE TABLE {qualified} (\n\t{}\n)\n", parts.join(",\n\t"));

    let mut constraints = Vec::new();
    for uq in child_objects(session, table.object_id, "UQ")? {
        constraints.push(STATEMENT_BREAK.to_string());
        constraints.push(unique_constraint_ddl(session, table.object_id, &qualified, &uq.name)?);
    }
    ddl.push('\n');
    ddl.push_str(&constraints.join("\n"));
    Ok(ddl)
}

fn unique_constraint_ddl(
    session: &Session,
    table_id: i64,
    qualified_table: &str,
    name: &str,
) -> Result<String> {
    let rows = session.query(
        UNIQUE_INDEX_SQL,
        &[Value::BigInt(table_id), Value::from(name)],
    )?;
    let Some(first) = rows.first() else {
        return Err(Error::database(format!(
            "no index found for unique constraint {name}"
        )));
    };
    let type_desc: String = first.get_as("type_desc")?;
    let data_space: String = first.get_as("data_space")?;
    let cols = rows.iter().map(key_column).collect::<Result<Vec<_>>>()?;
    Ok(format!(
        "ALTER TABLE {qualified_table} ADD CONSTRAINT {} UNIQUE {type_desc} ({}) ON {}",
        quote_ident_mssql(name),
        cols.join(", "),
        quote_ident_mssql(&data_space)
    ))
}
