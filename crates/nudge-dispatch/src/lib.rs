//! `nudge-dispatch` — the minute-cadence dispatch engine.
//!
//! Once per wall-clock minute the engine asks the store for every pending
//! task scheduled for that minute, marks each one `sent`, and forwards it
//! over an mpsc channel to the transport's delivery task. Delivery is
//! fire-and-forget: a transport failure is the delivery task's problem to
//! log, never a reason to put a task back.

pub mod engine;

pub use engine::DispatchEngine;
