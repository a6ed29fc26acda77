//! Dubber - Video Dubbing Client
//!
//! Submits video links to a dubbing backend and tracks the resulting
//! long-running jobs until the dubbed video is ready.

pub mod cli;
pub mod config;
pub mod client;
pub mod error;
pub mod job;
pub mod poller;
pub mod voice;
pub mod workflow;
