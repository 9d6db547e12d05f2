pub mod address;
pub mod error;
pub mod reference;
pub mod token;
pub mod value;

pub use address::*;
pub use error::*;
pub use reference::*;
pub use token::*;
pub use value::*;
