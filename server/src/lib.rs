//! # Card Duel Server Library
//!
//! This library provides the authoritative server for a two-player AR card
//! duel. Each player's client tracks a physical card; the server decides who
//! is in the game, which table slot each card occupies, how much health each
//! card has left and who wins. Clients only render what the server tells
//! them.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Duel State
//! Health, slot assignment and the outcome of every attack are computed here.
//! Each attack costs the target a fixed amount of health, floored at zero;
//! reaching zero ends the duel for that card.
//!
//! ### Participant Management
//! Handles the complete lifecycle of a participant:
//! - Admission with capacity, duplicate card and slot checks
//! - Contact tracking and eviction of silent participants
//! - Disconnection and slot release
//!
//! ### State Broadcasting
//! After every membership or health change each participant receives the
//! full roster, so a client that misses an event converges on the next one.
//!
//! ## Architecture Design
//!
//! ### One Lock, Many Tasks
//! Transports, per-participant writers and the liveness monitor are separate
//! tokio tasks. All duel state sits behind a single mutex in
//! [`context::ServerContext`]; events produced under the lock are delivered
//! after it is released, so a slow client never stalls the duel.
//!
//! ### Two Transports, One Duel
//! A UDP adapter speaks a pipe-delimited text protocol and a WebSocket
//! adapter speaks JSON. Both decode into the same [`shared::ClientCommand`]
//! set and may run at once against the same context.
//!
//! ## Module Organization
//!
//! ### Slots (`slots`) and Registry (`registry`)
//! Slot labels handed out in FIFO order, and the id-ordered participant table.
//!
//! ### Duel (`duel`)
//! Attack resolution and the events each attack produces.
//!
//! ### Broadcast (`broadcast`)
//! Roster snapshots and delivery of events to participant links.
//!
//! ### Liveness (`liveness`)
//! Per-transport timeouts and the periodic eviction task.
//!
//! ### Network (`network`)
//! The UDP and WebSocket adapters and the command dispatch they share.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::context::ServerContext;
//! use server::liveness::{spawn_liveness_monitor, LivenessPolicy};
//! use server::network::udp::UdpTransport;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let context = Arc::new(ServerContext::new(LivenessPolicy::default()));
//!     spawn_liveness_monitor(Arc::clone(&context));
//!
//!     let udp = UdpTransport::bind("127.0.0.1:7777", context).await?;
//!     udp.run().await;
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod config;
pub mod context;
pub mod duel;
pub mod error;
pub mod link;
pub mod liveness;
pub mod network;
pub mod registry;
pub mod slots;
