pub mod convert;
pub mod error;
pub mod io;
pub mod model;
pub mod normalize;
pub mod resolve;
pub mod table;

pub use error::{NormalizeError, Result, ToolError};
