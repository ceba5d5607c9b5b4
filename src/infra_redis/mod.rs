mod connection;
mod key_value_store_redis;

pub use connection::*;
pub use key_value_store_redis::*;
