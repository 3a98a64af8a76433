//! SQL script batches for setup and teardown.
//!
//! Scripts live in a `sql` directory, either the application's own or one per
//! component (`<root>/<component>/sql`). A target names either a directory of
//! `*.sql` files or a single file:
//!
//! - `run(session, "fixtures", false)` runs `sql/fixtures/*.sql` in file name
//!   order if that directory exists, otherwise `sql/fixtures.sql`.
//! - `run(session, "fixtures", true)` falls back to
//!   `sql/fixtures.<dialect>.sql`, e.g. `fixtures.sqlite.sql`.
//!
//! A file in a target directory whose first line contains
//! `dialect-require: postgresql, mssql` only runs on the listed dialects.
//!
//! Statements inside a file are separated by the text `--statement-break`.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use sqlbase_core::{Connection, Dialect, Error, PathKind, Result};
use sqlbase_session::{Session, transaction};

/// Separator between statements in a script file.
pub const STATEMENT_BREAK: &str = "--statement-break";

static DIALECT_REQUIRE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"dialect-require:\s*(?P<list>[A-Za-z0-9_+,\s]*)")
        .expect("dialect-require pattern is valid")
});

/// A script file resolved for execution.
#[derive(Debug, Clone)]
pub struct ScriptFile {
    /// Location on disk.
    pub path: PathBuf,
    /// File contents.
    pub contents: String,
}

impl ScriptFile {
    /// Non-empty statements of the file, trimmed.
    pub fn statements(&self) -> Vec<&str> {
        split_statements(&self.contents)
    }
}

/// Runs SQL files from one `sql` directory.
#[derive(Debug, Clone)]
pub struct SqlScripts {
    sql_dir: PathBuf,
}

impl SqlScripts {
    /// Scripts of an application, stored directly in `sql_dir`.
    pub fn new(sql_dir: impl Into<PathBuf>) -> Self {
        Self {
            sql_dir: sql_dir.into(),
        }
    }

    /// Scripts of a component: `<root>/<component>/sql`.
    pub fn for_component(root: impl AsRef<Path>, component: &str) -> Self {
        Self::new(root.as_ref().join(component).join("sql"))
    }

    /// Directory scripts are looked up in.
    pub fn sql_dir(&self) -> &Path {
        &self.sql_dir
    }

    /// Find the files `target` names, without running them.
    ///
    /// Directory targets return their `*.sql` files sorted by name, minus
    /// files restricted to other dialects. File targets return one file.
    pub fn resolve(&self, target: &str, dialect: Dialect, use_dialect: bool) -> Result<Vec<ScriptFile>> {
        match self.resolve_dir(target, dialect) {
            Ok(files) => return Ok(files),
            Err(Error::NotFound(_) | Error::WrongKind { .. }) => {}
            Err(e) => return Err(e),
        }

        let file_name = if use_dialect {
            format!("{target}.{}.sql", dialect.name())
        } else {
            format!("{target}.sql")
        };
        let path = self.sql_dir.join(file_name);
        if !path.exists() {
            return Err(Error::NotFound(path));
        }
        if !path.is_file() {
            return Err(Error::WrongKind {
                path,
                expected: PathKind::File,
            });
        }
        let contents = read_utf8(&path)?;
        Ok(vec![ScriptFile { path, contents }])
    }

    fn resolve_dir(&self, target: &str, dialect: Dialect) -> Result<Vec<ScriptFile>> {
        let dir = self.sql_dir.join(target);
        if !dir.exists() {
            return Err(Error::NotFound(dir));
        }
        if !dir.is_dir() {
            return Err(Error::WrongKind {
                path: dir,
                expected: PathKind::Directory,
            });
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let contents = read_utf8(&path)?;
            let first_line = contents.lines().next().unwrap_or_default();
            if allows_dialect(first_line, dialect) {
                files.push(ScriptFile { path, contents });
            } else {
                tracing::debug!(path = %path.display(), dialect = %dialect, "Skipping script for other dialects");
            }
        }
        Ok(files)
    }

    /// Run every statement of `target` in one transaction.
    ///
    /// Any failing statement rolls back the whole batch and its error is
    /// returned. Returns the number of statements executed.
    #[tracing::instrument(level = "debug", skip(self, session), fields(sql_dir = %self.sql_dir.display()))]
    pub fn run(&self, session: &mut Session, target: &str, use_dialect: bool) -> Result<usize> {
        let files = self.resolve(target, session.dialect(), use_dialect)?;
        transaction(session, |s| {
            let mut executed = 0;
            for file in &files {
                tracing::info!(path = %file.path.display(), "Processing SQL script");
                for statement in file.statements() {
                    s.execute_raw(statement)?;
                    executed += 1;
                }
            }
            Ok(executed)
        })
    }
}

/// Split script text at [`STATEMENT_BREAK`], dropping empty statements.
pub fn split_statements(contents: &str) -> Vec<&str> {
    contents
        .split(STATEMENT_BREAK)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Whether a file whose first line is `first_line` may run on `dialect`.
///
/// Files without a `dialect-require:` header run everywhere.
pub fn allows_dialect(first_line: &str, dialect: Dialect) -> bool {
    let Some(caps) = DIALECT_REQUIRE.captures(first_line) else {
        return true;
    };
    caps["list"]
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .any(|name| match name.parse::<Dialect>() {
            Ok(d) => d == dialect,
            Err(_) => {
                tracing::warn!(name, "Unknown dialect in dialect-require header");
                false
            }
        })
}

fn read_utf8(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    String::from_utf8(bytes).map_err(|e| {
        Error::Io(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} is not valid UTF-8: {e}", path.display()),
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_split_statements() {
        let sql = "\n-- header\nCREATE TABLE a (x int)\n--statement-break\n\n--statement-break\n  INSERT INTO a VALUES (1)  \n";
        assert_eq!(
            split_statements(sql),
            vec!["-- header\nCREATE TABLE a (x int)", "INSERT INTO a VALUES (1)"]
        );
    }

    #[test]
    fn test_allows_dialect() {
        assert!(allows_dialect("CREATE TABLE t (x int)", Dialect::Mssql));
        assert!(allows_dialect("-- dialect-require: sqlite", Dialect::Sqlite));
        assert!(!allows_dialect("-- dialect-require: sqlite", Dialect::Postgresql));
        assert!(allows_dialect("-- dialect-require: postgresql, mssql", Dialect::Mssql));
        assert!(!allows_dialect("-- dialect-require: postgresql, mssql", Dialect::Sqlite));
    }

    #[test]
    fn test_dialect_require_pattern_compiles() {
        let caps = DIALECT_REQUIRE
            .captures("-- dialect-require: sqlite, mssql")
            .unwrap();
        assert_eq!(caps["list"].trim(), "sqlite, mssql");
        assert!(DIALECT_REQUIRE.captures("-- plain comment").is_none());
    }

    #[test]
    fn test_resolve_directory_sorted_and_filtered() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("setup");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("02_b.sql"), "SELECT 2").unwrap();
        fs::write(dir.join("01_a.sql"), "SELECT 1").unwrap();
        fs::write(dir.join("03_pg.sql"), "-- dialect-require: postgresql\nSELECT 3").unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let scripts = SqlScripts::new(tmp.path());
        let files = scripts.resolve("setup", Dialect::Sqlite, false).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["01_a.sql", "02_b.sql"]);
    }

    #[test]
    fn test_resolve_file_with_dialect_suffix() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("seed.sqlite.sql"), "SELECT 1").unwrap();
        fs::write(tmp.path().join("seed.sql"), "SELECT 2").unwrap();

        let scripts = SqlScripts::new(tmp.path());
        let plain = scripts.resolve("seed", Dialect::Sqlite, false).unwrap();
        assert_eq!(plain[0].contents, "SELECT 2");
        let by_dialect = scripts.resolve("seed", Dialect::Sqlite, true).unwrap();
        assert_eq!(by_dialect[0].contents, "SELECT 1");

        let err = scripts.resolve("seed", Dialect::Mssql, true).unwrap_err();
        assert!(matches!(err, Error::NotFound(p) if p.ends_with("seed.mssql.sql")));
    }

    #[test]
    fn test_non_utf8_file_is_invalid_data() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("bad.sql"), [0xff, 0xfe, 0x00]).unwrap();
        let err = SqlScripts::new(tmp.path())
            .resolve("bad", Dialect::Sqlite, false)
            .unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::InvalidData));
    }

    #[test]
    fn test_component_layout() {
        let scripts = SqlScripts::for_component("/srv/app", "billing");
        assert_eq!(scripts.sql_dir(), Path::new("/srv/app/billing/sql"));
    }
}
