mod controller;
mod request;
mod search;

pub use controller::{Controller, ControllerPhase};
pub use request::ProvisionRequest;
pub use search::{SearchParams, SlotDecision, choose_slots};
