use odra::casper_types::U256;

/// A price observation together with the block time it was published at.
#[odra::odra_type]
pub struct PriceReading {
    /// Quoted price, same unit as strikes
    pub price: U256,
    /// Publish time in milliseconds
    pub timestamp: u64,
}

impl PriceReading {
    /// Create new reading
    pub fn new(price: U256, timestamp: u64) -> Self {
        Self { price, timestamp }
    }

    /// Milliseconds elapsed since publication; readings from the future are zero old.
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.timestamp)
    }

    /// Check if the reading is older than the freshness window
    pub fn is_stale(&self, now: u64, max_age: u64) -> bool {
        self.age(now) > max_age
    }

    /// True once the price has reached `strike`.
    pub fn crosses(&self, strike: U256) -> bool {
        self.price >= strike
    }
}
