pub mod bookings;
pub mod connection;
pub mod courts;
pub mod ledger;
pub mod matches;
pub mod models;
pub mod money;
pub mod ratings;
pub mod setup;
pub mod shares;
pub mod wallets;

pub use connection::{create_memory_pool, create_pool, get_connection, DbConn, DbPool};
pub use models::*;
