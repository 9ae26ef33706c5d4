pub mod gateway;
pub mod normalizer;
pub mod stats;
pub mod store;
pub mod transition;
pub mod workflow;
