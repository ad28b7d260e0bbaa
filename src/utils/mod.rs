mod mask;
pub use mask::*;
