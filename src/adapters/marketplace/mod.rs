//! Marketplace Adapters
//!
//! - **InMemoryMarketplace** - All marketplace services in memory
//!   (testing/development)

mod in_memory_marketplace;

pub use in_memory_marketplace::InMemoryMarketplace;
