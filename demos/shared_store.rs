//! Demo: one type-agnostic store shared by query families with different
//! value types.
//!
//! Stores hold type-erased entries, so a single instance can back every
//! query family in a process while each `execute` call stays fully typed.
//! Run with `cargo run --example shared_store`.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use query_cache::{MemoryStore, MemoryStoreConfig, QueryCoordinator, QueryDescriptor, Store};

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Coin {
    id: String,
    denomination: String,
    year: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Auction {
    id: u64,
    seller: String,
    current_bid: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // One process-wide store, explicitly constructed and passed around
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new(MemoryStoreConfig::default()));
    let coordinator = QueryCoordinator::new(Arc::clone(&store));

    // Coin lookups: fresh for 30s of a 60s window
    let coin_query = QueryDescriptor::for_query(
        "coins.detail",
        &"coin:denarius-7",
        Duration::from_secs(60),
    )?;

    let coin: Coin = coordinator
        .execute(&coin_query, || async {
            println!("producing coin from the backing service...");
            Ok::<_, std::io::Error>(Coin {
                id: "coin:denarius-7".to_string(),
                denomination: "denarius".to_string(),
                year: -44,
            })
        })
        .await?;
    println!("coin: {coin:?}");

    // Auction lookups share the same store under their own keys, with a
    // tighter staleness threshold for faster-moving data
    let auction_query = QueryDescriptor::for_query("auctions.detail", &42u64, Duration::from_secs(30))?
        .with_stale_after(Duration::from_secs(5))?;

    let auction: Auction = coordinator
        .execute(&auction_query, || async {
            println!("producing auction from the backing service...");
            Ok::<_, std::io::Error>(Auction {
                id: 42,
                seller: "seller-9".to_string(),
                current_bid: 1250,
            })
        })
        .await?;
    println!("auction: {auction:?}");

    // Second reads are fresh hits: no producer call
    let coin: Coin = coordinator
        .execute(&coin_query, || async {
            println!("this is not printed - fresh hit");
            Ok::<_, std::io::Error>(Coin {
                id: String::new(),
                denomination: String::new(),
                year: 0,
            })
        })
        .await?;
    println!("coin (cached): {coin:?}");
    println!("store occupancy: {}", store.size().await);

    // A bid came in elsewhere: evict every cached query embedding this auction
    coordinator.invalidate(Some("auctions.detail:42")).await;
    println!("store occupancy after invalidation: {}", store.size().await);

    Ok(())
}
