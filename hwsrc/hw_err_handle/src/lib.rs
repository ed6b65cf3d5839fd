#[macro_use] extern crate serde_derive;

pub mod map_to_traced;
pub mod map_traced;
pub mod or_traced;
pub mod traced_error;

pub mod prelude {
    pub use crate::map_to_traced::MapToTraced;
    pub use crate::map_traced::MapTraced;
    pub use crate::or_traced::OrTraced;
    pub use crate::traced_error::{TracedError, TracedResult};
}
