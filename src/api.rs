pub mod emi;
pub mod heartbeat;
pub mod mqtt;
