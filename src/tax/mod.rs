pub mod fifo;
pub mod notes;
pub mod term;

pub use fifo::{FifoMatcher, ONE_SATOSHI};
pub use notes::Annotation;
pub use term::Term;
