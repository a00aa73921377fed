//! Client-side state for each browser session.
//!
//! # Services
//!
//! - `cart` - Cart snapshot and item count, mutated through one upsert call
//! - `wishlist` - Wishlist snapshot gated by the authentication flag
//! - `loading` - In-flight flag the screens use to disable cart and wishlist controls
//! - `context` - Per-session client context and its registry
//! - `checkout` - Address, order and payment sequence with pending-payment recovery

pub mod cart;
pub mod checkout;
pub mod context;
pub mod loading;
pub mod wishlist;
