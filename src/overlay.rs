pub mod gauge;
pub mod sequence;
