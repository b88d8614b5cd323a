pub mod ai;
pub mod assistant;
pub mod booking;
pub mod calendar;
pub mod composer;
pub mod dialogue;
pub mod extract;
pub mod policy;
