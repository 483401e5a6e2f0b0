//! Sentinel SOAR Console
//!
//! Client-side core of the Sentinel security operations console:
//! - Polling of health, live traffic, overview metrics and the admin queue
//! - Derived overview metrics when the backend aggregate is unavailable
//! - Incident resolution with optimistic updates and cross-view notification
//! - Admin session persistence
//! - Compliance export, threat map summaries and assistant chat
//! - Simulated backend for offline use
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          SENTINEL CONSOLE                                │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                          │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐  ┌─────────────┐ │
//! │  │   Health     │  │ Live Traffic │  │   Overview   │  │ Admin Desk  │ │
//! │  │   Poller     │  │    Poller    │  │ (+fallback)  │  │  (resolve)  │ │
//! │  └──────┬───────┘  └──────┬───────┘  └──────┬───────┘  └──────┬──────┘ │
//! │         │                 │                 │                 │         │
//! │         └─────────────────┼─────────────────┼─────────────────┘         │
//! │                           ▼                 ▼                           │
//! │                    ┌──────────────────────────────┐                    │
//! │                    │    SoarApi (live | sim)      │◄── Credentials     │
//! │                    └──────────────────────────────┘    (SessionStore)  │
//! │                                                                          │
//! │           Admin Desk ──► ResolutionBus ──► other listeners              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod aggregator;
pub mod api;
pub mod bus;
pub mod chat;
pub mod compliance;
pub mod config;
pub mod error;
pub mod incidents;
pub mod models;
pub mod poller;
pub mod pollers;
pub mod session;
pub mod simulation;
pub mod threats;

#[cfg(test)]
mod testing;

pub use api::{ApiClient, ChatStream, ChunkSource, Credentials, SoarApi};
pub use bus::{IncidentResolved, ResolutionBus};
pub use chat::ChatTranscript;
pub use config::{ConsoleConfig, DataMode, PollIntervals};
pub use error::{ConsoleError, ConsoleResult};
pub use incidents::{AdminDesk, AdminSnapshot};
pub use models::*;
pub use poller::{PollHandle, PollSource, PollState, Poller};
pub use session::{FileTokenStorage, MemoryTokenStorage, SessionStore, TokenStorage};
pub use simulation::SimulatedApi;
