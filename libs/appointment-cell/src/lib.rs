pub mod error;
pub mod models;
pub mod services;

pub use error::AppointmentError;
pub use models::*;
pub use services::gateway::{AppointmentGateway, RestAppointmentGateway};
pub use services::normalizer::normalize;
pub use services::stats::{aggregate, aggregate_on};
pub use services::store::AppointmentStore;
pub use services::transition::{authorize, TransitionEngine};
pub use services::workflow::AppointmentWorkflow;
