mod common;
pub mod tensor;

pub use tensor::*;
