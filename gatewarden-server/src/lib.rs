//! gatewarden-server: Discord verification gateway.
//!
//! Users prove control of a Discord account through the OAuth code flow;
//! gatewarden stores the resulting grant, tags verified users with a role,
//! and can later pull every verified user into the guild in one batch.

pub mod admission;
pub mod audit;
pub mod config;
pub mod discord;
pub mod server;
pub mod session;
pub mod store;
pub mod web;
