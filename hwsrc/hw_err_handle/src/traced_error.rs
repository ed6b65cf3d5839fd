//! A unified error representation tracing the path an error travelled through the code.
//!
//! # Tracing while chaining
//!
//! `TracedError` records the file and line of every place where an error was created, mapped
//! or converted, so that a failure deep inside the device protocol can be attributed to the
//! exact call chain without a panic backtrace.
//!
//! * A plain [`Result<T, E1>`] is lifted into [`TracedResult<T, E2>`] with
//!   [`MapToTraced::map_to_traced`](crate::map_to_traced::MapToTraced::map_to_traced);
//! * an already traced [`TracedResult<T, E1>`] is converted into [`TracedResult<T, E2>`] with
//!   [`MapTraced::map_traced`](crate::map_traced::MapTraced::map_traced);
//! * an [`Option<T>`] is lifted with [`OrTraced::or_traced`](crate::or_traced::OrTraced::or_traced).
//!
//! The operator `?` lifts a plain `E` into `TracedError<E>` and tracks the location where it
//! was applied. Conversions between two *different* traced error types always go through the
//! explicit combinators above, so every hop is visible in the trace.
//!
//! # Serialization
//!
//! The serialized representation consists of the following fields:
//! * `error` - the common error description;
//! * `error_path` - the error path consisting of file names separated by a dot similar to JSON path notation;
//!   Example: `client.flow`
//! * `error_trace` - a more detailed error path consisting of file and line number pairs separated by ']';
//!   Example: `client:102] flow:88]`
//! * the inner error is flattened into the remaining fields. For the flattened form not to clash
//!   with the outer fields, the inner type should be an adjacently tagged enum
//!   (`#[serde(tag = "error_type", content = "error_data")]`).

use derive_more::Display;
use itertools::Itertools;
use serde::{Serialize, Serializer};
use std::fmt;
use std::panic::Location;

pub type TracedResult<T, E> = Result<T, TracedError<E>>;

/// The unified error representation tracing an error path.
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[display(fmt = "{} {}", "trace.formatted()", etype)]
pub struct TracedError<E> {
    pub(crate) etype: E,
    pub(crate) trace: Vec<TraceLocation>,
}

/// Track the location whenever a plain `E` is lifted by the operator `?`.
impl<E> From<E> for TracedError<E> {
    #[track_caller]
    fn from(etype: E) -> Self { TracedError::new(etype) }
}

impl<E> Serialize for TracedError<E>
where
    E: Serialize + fmt::Display,
{
    fn serialize<S>(&self, serializer: S) -> Result<<S as Serializer>::Ok, <S as Serializer>::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        struct ErrorHelper<'a, E> {
            error: String,
            error_path: String,
            error_trace: String,
            #[serde(flatten)]
            etype: &'a E,
        }

        let helper = ErrorHelper {
            error: self.etype.to_string(),
            error_path: self.path(),
            error_trace: self.stack_trace(),
            etype: &self.etype,
        };
        helper.serialize(serializer)
    }
}

impl<E> TracedError<E> {
    #[track_caller]
    pub fn new(etype: E) -> TracedError<E> {
        let location = TraceLocation::from(Location::caller());
        TracedError {
            etype,
            trace: vec![location],
        }
    }

    #[track_caller]
    pub fn err<T>(etype: E) -> Result<T, TracedError<E>> { Err(TracedError::new(etype)) }

    /// Map the inner error type, tracking the location where the mapping took place.
    #[track_caller]
    pub fn map<MapE, F>(mut self, f: F) -> TracedError<MapE>
    where
        F: FnOnce(E) -> MapE,
    {
        self.trace.push(TraceLocation::from(Location::caller()));
        TracedError {
            etype: f(self.etype),
            trace: self.trace,
        }
    }

    pub fn get_inner(&self) -> &E { &self.etype }

    pub fn into_inner(self) -> E { self.etype }

    /// Format the trace similar to JSON path notation: `client.flow`.
    /// The returned path is deduplicated.
    pub fn path(&self) -> String {
        self.trace
            .iter()
            .map(|src| src.file)
            .rev()
            .dedup()
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Format the trace similar to a stack trace: `client:102] flow:88]`.
    pub fn stack_trace(&self) -> String {
        self.trace
            .iter()
            .map(|src| src.formatted())
            .rev()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub trait FormattedTrace {
    fn formatted(&self) -> String;
}

/// The location where an error was tracked.
/// The location is formatted like this:
/// ```txt
/// location_file:379]
/// ```
#[derive(Clone, Debug, Display, Eq, PartialEq)]
#[display(fmt = "{}:{}]", file, line)]
pub struct TraceLocation {
    file: &'static str,
    line: u32,
}

impl From<&'static Location<'static>> for TraceLocation {
    fn from(location: &'static Location<'static>) -> Self {
        TraceLocation {
            file: filename(location.file()),
            line: location.line(),
        }
    }
}

impl FormattedTrace for TraceLocation {
    fn formatted(&self) -> String { self.to_string() }
}

impl TraceLocation {
    pub fn new(file: &'static str, line: u32) -> TraceLocation { TraceLocation { file, line } }

    pub fn file(&self) -> &'static str { self.file }

    pub fn line(&self) -> u32 { self.line }
}

impl<T: FormattedTrace> FormattedTrace for Vec<T> {
    fn formatted(&self) -> String {
        self.iter()
            .map(|src| src.formatted())
            .rev()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Strip the directory components and the `.rs` extension from a `file!()`-like path.
fn filename(path: &'static str) -> &'static str {
    path.rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(path)
        .trim_end_matches(".rs")
}
