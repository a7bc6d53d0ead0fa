//! A `TripleStoreConnection` test double. Not a production backend (§1
//! Non-goals exclude a real triple-store and the full SPARQL surface): it
//! holds quads directly and lets tests script `select` responses rather
//! than interpreting SPARQL text itself.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::connection::{Quad, TripleStoreConnection, TupleRow};
use crate::error::DriverError;

#[derive(Debug, Default)]
pub struct MemoryTripleStore {
    quads: Mutex<Vec<Quad>>,
    scripted_selects: Mutex<VecDeque<Vec<TupleRow>>>,
    select_log: Mutex<Vec<String>>,
    update_log: Mutex<Vec<String>>,
    in_transaction: Mutex<bool>,
}

impl MemoryTripleStore {
    pub fn new() -> MemoryTripleStore {
        MemoryTripleStore::default()
    }

    /// Queues the rows the next `select()` call should return.
    pub fn push_select_response(&self, rows: Vec<TupleRow>) {
        self.scripted_selects.lock().unwrap().push_back(rows);
    }

    pub fn quads(&self) -> Vec<Quad> {
        self.quads.lock().unwrap().clone()
    }

    pub fn select_log(&self) -> Vec<String> {
        self.select_log.lock().unwrap().clone()
    }

    pub fn update_log(&self) -> Vec<String> {
        self.update_log.lock().unwrap().clone()
    }

    pub fn select_call_count(&self) -> usize {
        self.select_log.lock().unwrap().len()
    }
}

#[async_trait]
impl TripleStoreConnection for MemoryTripleStore {
    async fn begin(&self) -> Result<(), DriverError> {
        *self.in_transaction.lock().unwrap() = true;
        Ok(())
    }

    async fn commit(&self) -> Result<(), DriverError> {
        *self.in_transaction.lock().unwrap() = false;
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DriverError> {
        *self.in_transaction.lock().unwrap() = false;
        Ok(())
    }

    async fn add_quad(&self, quad: Quad) -> Result<(), DriverError> {
        self.quads.lock().unwrap().push(quad);
        Ok(())
    }

    async fn remove_quad(&self, quad: Quad) -> Result<(), DriverError> {
        self.quads.lock().unwrap().retain(|existing| existing != &quad);
        Ok(())
    }

    async fn select(&self, query: &str) -> Result<Vec<TupleRow>, DriverError> {
        self.select_log.lock().unwrap().push(query.to_owned());
        Ok(self.scripted_selects.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn update(&self, update: &str) -> Result<(), DriverError> {
        self.update_log.lock().unwrap().push(update.to_owned());
        Ok(())
    }
}
