//! ISBN to unit price lookup, built once per run and then frozen

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

/// How a repeated ISBN in the price list is resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Later rows overwrite earlier ones (price list table order)
    #[default]
    LastWins,
    FirstWins,
    Lowest,
}

/// Mutable side of the price lookup
#[derive(Debug, Default)]
pub struct PriceBookBuilder {
    policy: DuplicatePolicy,
    prices: HashMap<String, Decimal>,
}

impl PriceBookBuilder {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            prices: HashMap::new(),
        }
    }

    /// Record a price. Returns `true` when the ISBN was already present.
    pub fn insert(&mut self, isbn: String, price: Decimal) -> bool {
        match self.prices.entry(isbn) {
            Entry::Vacant(slot) => {
                slot.insert(price);
                false
            }
            Entry::Occupied(mut slot) => {
                match self.policy {
                    DuplicatePolicy::LastWins => {
                        slot.insert(price);
                    }
                    DuplicatePolicy::FirstWins => {}
                    DuplicatePolicy::Lowest => {
                        if price < *slot.get() {
                            slot.insert(price);
                        }
                    }
                }
                true
            }
        }
    }

    pub fn build(self) -> PriceBook {
        PriceBook {
            prices: self.prices,
        }
    }
}

/// Read-only ISBN price lookup
#[derive(Debug, Clone, Default)]
pub struct PriceBook {
    prices: HashMap<String, Decimal>,
}

impl PriceBook {
    pub fn get(&self, isbn: &str) -> Option<Decimal> {
        self.prices.get(isbn).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}
