pub mod scan;
pub mod target;
pub mod vulnerability;

pub use scan::*;
pub use target::*;
pub use vulnerability::*;
