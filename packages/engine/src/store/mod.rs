mod error;
mod traits;

pub mod memory;
pub mod rest;

pub use error::StoreError;
pub use memory::MemoryResponseStore;
pub use rest::RestResponseStore;
pub use traits::ResponseStore;
