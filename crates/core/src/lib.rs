//! Bindery Core - Shared types library.
//!
//! This crate provides the domain types used by the Bindery storefront and
//! its integration tests:
//!
//! - Type-safe IDs for every remote entity (products, carts, orders, ...)
//! - [`Money`] for decimal prices as the bookstore API reports them
//! - [`Role`], [`RoleSet`] and [`Capability`] for back-office authorization
//! - [`OrderStatus`] with the transition table the storefront displays
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O and no
//! HTTP clients. The bookstore API is the source of truth for everything
//! these types describe.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
