pub mod breakpoint;
pub mod execution;
pub mod variable;

pub use breakpoint::*;
pub use execution::*;
pub use variable::*;
