pub mod matching;
pub mod model;
pub mod title;

pub use matching::{find_best_match, MatchStrategy, WindowMatch};
pub use model::{DisplaySnapshot, Layout, WindowFrame, WindowSnapshot, CURRENT_VERSION};
pub use title::normalize;
