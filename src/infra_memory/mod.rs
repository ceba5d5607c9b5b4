mod key_value_store_memory;

pub use key_value_store_memory::*;
