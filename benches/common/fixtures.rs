use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Test data structure for benchmarks
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BenchRecord {
    pub id: u64,
    pub name: String,
    pub score: u32,
}

impl BenchRecord {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            name: format!("Record {}", id),
            score: (id % 1000) as u32,
        }
    }
}

/// Simulated producer backend with configurable latency
#[derive(Clone)]
pub struct FakeDatabase {
    data: Arc<HashMap<String, BenchRecord>>,
    latency_ms: u64,
    query_count: Arc<AtomicUsize>,
}

impl FakeDatabase {
    pub fn new(num_records: usize, latency_ms: u64) -> Self {
        let mut data = HashMap::new();
        for i in 0..num_records {
            data.insert(format!("record:{}", i), BenchRecord::new(i as u64));
        }

        Self {
            data: Arc::new(data),
            latency_ms,
            query_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn get(&self, key: &str) -> Result<BenchRecord, std::io::Error> {
        self.query_count.fetch_add(1, Ordering::Relaxed);

        // Simulate producer latency
        tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;

        self.data
            .get(key)
            .cloned()
            .ok_or_else(|| std::io::Error::other("record not found"))
    }

    #[allow(dead_code)]
    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::Relaxed)
    }

    #[allow(dead_code)]
    pub fn reset_count(&self) {
        self.query_count.store(0, Ordering::Relaxed);
    }
}

/// Generate test keys for different workload patterns
pub struct KeyGenerator {
    num_keys: usize,
}

impl KeyGenerator {
    pub fn new(num_keys: usize) -> Self {
        Self { num_keys }
    }

    /// Generate sequential keys (for cold cache tests)
    pub fn sequential(&self) -> Vec<String> {
        (0..self.num_keys).map(|i| format!("record:{}", i)).collect()
    }

    /// Generate keys with Zipf distribution (realistic - few hot keys)
    #[allow(dead_code)]
    pub fn zipf_random(&self, count: usize) -> Vec<String> {
        let mut rng = rand::thread_rng();
        let mut keys = Vec::with_capacity(count);

        for _ in 0..count {
            // Simplified Zipf: 80% of requests go to 20% of keys
            let key_id = if rng.gen_bool(0.8) {
                rng.gen_range(0..(self.num_keys / 5))
            } else {
                rng.gen_range((self.num_keys / 5)..self.num_keys)
            };
            keys.push(format!("record:{}", key_id));
        }

        keys
    }
}

#[cfg(test)]
mod tests {
    #[tokio::test]
    async fn test_fake_database() {
        use super::FakeDatabase;

        let db = FakeDatabase::new(100, 1);

        let record = db.get("record:0").await.unwrap();
        assert_eq!(record.id, 0);
        assert_eq!(db.query_count(), 1);
    }

    #[test]
    fn test_key_generator() {
        use super::KeyGenerator;

        let key_gen = KeyGenerator::new(100);

        let seq = key_gen.sequential();
        assert_eq!(seq.len(), 100);
        assert_eq!(seq[0], "record:0");

        let zipf = key_gen.zipf_random(100);
        assert_eq!(zipf.len(), 100);
    }
}
