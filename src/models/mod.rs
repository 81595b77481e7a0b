mod character;
mod mention;
mod report;
mod video;

pub use character::*;
pub use mention::*;
pub use report::*;
pub use video::*;
