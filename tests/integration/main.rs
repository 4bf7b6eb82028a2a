//! End-to-end tests driving full cycles over a fixture data directory.

mod mock_provider;
mod pipeline;
