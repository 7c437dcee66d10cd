//! Line-oriented chat front-end

pub mod accumulator;
pub mod repl;

pub use accumulator::TurnAccumulator;
pub use repl::run_repl;
