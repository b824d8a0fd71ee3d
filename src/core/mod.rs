//! Core conversation orchestration
//!
//! This module contains the single authority for turning user input events
//! into rendered exchanges: the conversation controller and its state.

mod controller;

pub use controller::{
    ControllerEvent, ConversationController, InteractionState, Notice, PendingSubmission,
    SubmitOutcome,
};
