pub mod error;
pub mod filesystem;
pub mod resolver;

pub use error::*;
pub use filesystem::*;
pub use resolver::*;
