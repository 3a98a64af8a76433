//! Transaction wrappers and the single-result-or-none adapter.
//!
//! [`transaction`] runs an operation and ends the transaction exactly once:
//! commit when the operation returns `Ok`, rollback when it returns `Err`.
//! [`ignore_unique`] does the same but turns a uniqueness violation on one of
//! the fields named at wrap time into `Ok(None)`.
//!
//! Wrappers nest. The outermost wrapper on a session owns the transaction
//! (`BEGIN` ... `COMMIT`/`ROLLBACK`); inner wrappers run inside a savepoint,
//! so an inner failure that is ignored leaves the outer work intact.
//!
//! Uniqueness violations are recognised by matching driver message text (see
//! [`sqlbase_core::UniqueViolation`]). A driver that rewords its messages
//! turns an ignored violation into a propagated error.

use sqlbase_core::{Connection, Error, Result};

use crate::session::Session;

/// Run `op` in a transaction: commit on `Ok`, roll back and return the error
/// on `Err`.
///
/// # Example
///
/// ```ignore
/// let car = transaction(&mut session, |s| Car::add(s, json!({"make": "ford"})))?;
/// ```
pub fn transaction<T, F>(session: &mut Session, op: F) -> Result<T>
where
    F: FnOnce(&mut Session) -> Result<T>,
{
    run_wrapped(session, op, |_| false)?.ok_or_else(|| {
        Error::database("transaction wrapper lost the operation result")
    })
}

/// Like [`transaction`], but a uniqueness violation on any of `fields` is
/// rolled back and reported as `Ok(None)`.
///
/// An empty `fields` slice ignores nothing, making this a plain
/// [`transaction`] with an `Option` result. Every other error, including
/// violations on unlisted fields, propagates.
pub fn ignore_unique<T, F>(session: &mut Session, fields: &[&str], op: F) -> Result<Option<T>>
where
    F: FnOnce(&mut Session) -> Result<T>,
{
    let dialect = session.dialect();
    run_wrapped(session, op, |err| {
        fields
            .iter()
            .any(|f| err.is_unique_violation(dialect, Some(*f)))
    })
}

/// Convert [`Error::NoResultFound`] from `op` into `Ok(None)`.
///
/// Every other error, [`Error::MultipleResultsFound`] included, propagates
/// unchanged.
pub fn one_or_none<T, F>(op: F) -> Result<Option<T>>
where
    F: FnOnce() -> Result<T>,
{
    match op() {
        Ok(value) => Ok(Some(value)),
        Err(Error::NoResultFound) => Ok(None),
        Err(e) => Err(e),
    }
}

#[tracing::instrument(level = "debug", skip(session, op, ignore), fields(depth = session.wrapper_depth()))]
fn run_wrapped<T, F, I>(session: &mut Session, op: F, ignore: I) -> Result<Option<T>>
where
    F: FnOnce(&mut Session) -> Result<T>,
    I: Fn(&Error) -> bool,
{
    if session.wrapper_depth() == 0 {
        run_outermost(session, op, ignore)
    } else {
        run_nested(session, op, ignore)
    }
}

fn run_outermost<T, F, I>(session: &mut Session, op: F, ignore: I) -> Result<Option<T>>
where
    F: FnOnce(&mut Session) -> Result<T>,
    I: Fn(&Error) -> bool,
{
    session.begin()?;
    session.enter_wrapper();
    let outcome = op(session);
    session.exit_wrapper();

    match outcome {
        Ok(value) => {
            if let Err(commit_err) = session.commit() {
                if let Err(rb_err) = session.rollback() {
                    tracing::warn!(error = %rb_err, "rollback after failed commit also failed");
                }
                return Err(commit_err);
            }
            Ok(Some(value))
        }
        Err(err) => {
            if let Err(rb_err) = session.rollback() {
                tracing::warn!(error = %rb_err, "rollback failed");
            }
            if ignore(&err) {
                tracing::info!(error = %err, "ignoring uniqueness violation");
                Ok(None)
            } else {
                Err(err)
            }
        }
    }
}

fn run_nested<T, F, I>(session: &mut Session, op: F, ignore: I) -> Result<Option<T>>
where
    F: FnOnce(&mut Session) -> Result<T>,
    I: Fn(&Error) -> bool,
{
    let savepoint = session.savepoint()?;
    session.enter_wrapper();
    let outcome = op(session);
    session.exit_wrapper();

    match outcome {
        Ok(value) => {
            session.release_savepoint(&savepoint)?;
            Ok(Some(value))
        }
        Err(err) => {
            if let Err(rb_err) = session.rollback_to_savepoint(&savepoint) {
                tracing::warn!(error = %rb_err, savepoint = %savepoint, "rollback to savepoint failed");
                return Err(err);
            }
            if ignore(&err) {
                tracing::info!(error = %err, savepoint = %savepoint, "ignoring uniqueness violation");
                Ok(None)
            } else {
                Err(err)
            }
        }
    }
}
