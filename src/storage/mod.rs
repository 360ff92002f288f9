pub mod local;
#[cfg(test)]
pub mod memory;
pub mod provider;

pub use local::*;
#[cfg(test)]
pub use memory::*;
pub use provider::*;
