//! VetCare+ AI - Flows backed by a hosted generative model
//!
//! - [`ChatConcierge`]: receptionist chat that can hand a conversation to staff
//! - [`CarePlanner`]: structured care plans for a pet
//! - [`TimeSuggester`]: candidate appointment times, filtered for bookability
//!
//! Every flow talks to the model through [`GenerativeModel`], so tests and
//! offline runs swap in [`ScriptedModel`].

mod care_plan;
mod chat;
mod error;
mod gemini;
mod model;
mod prompts;
mod suggest;

pub use care_plan::{CarePlan, CarePlanner};
pub use chat::{ChatConcierge, ChatReply, ChatTurn, NOTIFY_HUMAN};
pub use error::{Error, Result};
pub use gemini::{GeminiClient, GeminiConfig};
pub use model::{
    BoxFuture, GenerateRequest, GenerateResponse, GenerativeModel, Message, Part, Role,
    ScriptedModel, ToolDeclaration,
};
pub use suggest::{BookedSlot, SuggestRequest, TimeSuggester, MAX_SUGGESTIONS};
