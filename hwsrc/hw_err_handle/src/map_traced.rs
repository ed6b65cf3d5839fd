use crate::traced_error::{TracedError, TracedResult};

/// Convert a traced [`Result<T, TracedError<E1>>`] into [`Result<T, TracedError<E2>>`],
/// appending the location where the conversion took place to the existing trace.
pub trait MapTraced<T, E1, E2> {
    fn map_traced<F>(self, f: F) -> TracedResult<T, E2>
    where
        F: FnOnce(E1) -> E2;
}

impl<T, E1, E2> MapTraced<T, E1, E2> for TracedResult<T, E1> {
    #[track_caller]
    fn map_traced<F>(self, f: F) -> TracedResult<T, E2>
    where
        F: FnOnce(E1) -> E2,
    {
        // do not use [`Result::map_err`], because we should keep the `track_caller` chain
        match self {
            Ok(x) => Ok(x),
            Err(e) => Err(e.map(f)),
        }
    }
}
