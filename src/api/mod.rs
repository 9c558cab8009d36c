//! REST and streaming client for the RAG chat backend.

mod client;

pub use client::{RagApiClient, BUILD_PATH, CHAT_QUERY_PATH};
