//! Consultation flow: a staged conversation with the astrology backend.
//!
//! A session moves through introduction, birth-details collection, chart
//! analysis and topic selection. The controller owns the session state and
//! publishes every change; extraction and fallback replies are pure helpers.

pub mod continuation;
pub mod controller;
pub mod extract;
pub mod fallback;
pub mod model;
pub mod prompts;
pub mod stage;

pub use controller::{ControllerEvent, ConversationController, SessionSnapshot};
pub use extract::{BirthDetailsExtractor, extract_birth_details};
pub use fallback::fallback_reply;
pub use model::{BirthDetails, Message, Role, Topic, fields};
pub use stage::ConversationStage;
