//! # Card Duel Client Library
//!
//! A terminal client for the card duel server, speaking the UDP text
//! protocol. It stands in for the AR client when driving a duel by hand:
//! connect with a card id, attack, ask for the roster or your slot. It never
//! decides anything itself and only shows what the server reports.
//!
//! ## Module Organization
//!
//! ### Input Module (`input`)
//! Turns typed lines such as `connect CARD_A` or `attack CARD_B` into
//! protocol commands.
//!
//! ### Network Module (`network`)
//! Owns the UDP socket, sends commands and heartbeats, and keeps a local
//! [`network::Session`] updated from server events.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = Client::new("127.0.0.1:7777").await?;
//!     client
//!         .run(Some("CARD_A".to_string()), Duration::from_secs(3))
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod input;
pub mod network;
