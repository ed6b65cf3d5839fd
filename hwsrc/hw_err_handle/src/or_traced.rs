use crate::traced_error::{TracedError, TracedResult};

/// Lift an [`Option<T>`] into a traced [`Result<T, TracedError<E>>`],
/// tracking the location where the `None` was turned into an error.
pub trait OrTraced<T, E> {
    fn or_traced<F>(self, f: F) -> TracedResult<T, E>
    where
        F: FnOnce() -> E;
}

impl<T, E> OrTraced<T, E> for Option<T> {
    #[track_caller]
    fn or_traced<F>(self, f: F) -> TracedResult<T, E>
    where
        F: FnOnce() -> E,
    {
        match self {
            Some(x) => Ok(x),
            None => Err(TracedError::new(f())),
        }
    }
}
