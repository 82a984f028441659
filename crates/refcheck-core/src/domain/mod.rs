pub mod errors;

pub use errors::{HarnessError, HarnessErrorCategory, HarnessResult};
