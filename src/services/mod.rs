pub mod matches;
pub mod notifications;
pub mod server;
pub mod sweeper;
pub mod wallet;
