pub mod account;
pub mod memory;

pub use account::AccountStore;
pub use memory::MemoryAccountStore;
