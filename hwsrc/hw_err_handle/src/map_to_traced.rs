use crate::traced_error::TracedError;

/// Lift a plain [`Result<T, E1>`] into a traced [`Result<T, TracedError<E2>>`],
/// tracking the location where the mapping took place.
pub trait MapToTraced<T, E1, E2> {
    fn map_to_traced<F>(self, f: F) -> Result<T, TracedError<E2>>
    where
        F: FnOnce(E1) -> E2;
}

impl<T, E1, E2> MapToTraced<T, E1, E2> for Result<T, E1> {
    #[track_caller]
    fn map_to_traced<F>(self, f: F) -> Result<T, TracedError<E2>>
    where
        F: FnOnce(E1) -> E2,
    {
        // do not use [`Result::map_err`], because we should keep the `track_caller` chain
        match self {
            Ok(x) => Ok(x),
            Err(e) => Err(TracedError::new(f(e))),
        }
    }
}
