pub mod diagnosis;
pub mod enums;
pub mod history;

pub use diagnosis::*;
pub use enums::*;
pub use history::*;
