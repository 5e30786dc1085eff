pub mod assert;
pub mod diff;
pub mod expectation;
pub mod results;
pub mod spec;
