mod accessibility;
mod display;
mod workspace;

pub use accessibility::*;
pub use display::*;
pub use workspace::*;
