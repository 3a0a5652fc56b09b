pub mod interface;
pub mod multicast;
