pub mod appointment;
pub mod catalog;
pub mod conversation;
pub mod opening_hours;
pub mod request;
pub mod settings;

pub use appointment::{Appointment, AppointmentStatus, NewAppointment, CLASS_DURATION_MINUTES};
pub use catalog::{Catalog, KnowledgeEntry, Partner, Plan, Promotion};
pub use conversation::{AppointmentIntent, ChatMessage, ConversationContext, UserInfo};
pub use opening_hours::{OpeningHours, OpeningSlot};
pub use request::{AppointmentRequest, MissingField, Slot};
pub use settings::{AcademySettings, SchedulingPolicy};
