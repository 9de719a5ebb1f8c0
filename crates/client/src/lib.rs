//! Outbound HTTP clients for the trade-data service.
//!
//! This crate provides the Supabase REST reader behind
//! [`tradex_core::DatasetSource`] and the OpenRouter chat client behind
//! [`tradex_core::Translator`].

pub mod store;
pub mod translator;

pub use store::{StoreConfig, StoreError, SupabaseClient};
pub use translator::{OpenRouterClient, TranslatorConfig, TranslatorError};
