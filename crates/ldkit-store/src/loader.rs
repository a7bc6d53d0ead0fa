//! The cooperative driver of §4.10/§5: alternates read and write rounds,
//! joining each round's worker futures before moving to the next. Reads
//! scheduled in round N observe the store after round N−1's writes and
//! before round N's writes, which is what makes cascade-delete safe.

use std::sync::Arc;

use futures::future::join_all;

use crate::connection::TripleStoreConnection;
use crate::error::StoreError;
use crate::worker::Worker;

pub struct Loader {
    connection: Arc<dyn TripleStoreConnection>,
    readers: Vec<Arc<dyn Worker>>,
    writers: Vec<Arc<dyn Worker>>,
    max_rounds: usize,
}

impl Loader {
    pub fn new(
        connection: Arc<dyn TripleStoreConnection>,
        readers: Vec<Arc<dyn Worker>>,
        writers: Vec<Arc<dyn Worker>>,
        max_rounds: usize,
    ) -> Loader {
        Loader { connection, readers, writers, max_rounds }
    }

    /// Runs rounds until both the read and write phases produce zero work,
    /// or `max_rounds` is reached.
    ///
    /// Yields back to the executor after each phase. A caller that joins
    /// this future against its own business logic (e.g. a Retriever or
    /// Writer awaiting these same workers' futures) needs that yield point
    /// to observe a just-completed read and register the resulting write
    /// before this loop decides the round produced no further work.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn drive(&self) -> Result<usize, StoreError> {
        for round in 0..self.max_rounds {
            let read_work = self.run_phase(&self.readers).await?;
            tokio::task::yield_now().await;
            let write_work = self.run_phase(&self.writers).await?;
            tokio::task::yield_now().await;
            if !read_work && !write_work {
                return Ok(round);
            }
        }
        Ok(self.max_rounds)
    }

    async fn run_phase(&self, workers: &[Arc<dyn Worker>]) -> Result<bool, StoreError> {
        let connection = &self.connection;
        let futures = workers.iter().map(|worker| {
            let worker = Arc::clone(worker);
            async move { worker.run(connection.as_ref()).await }
        });

        let mut any_work = false;
        for result in join_all(futures).await {
            any_work |= result?;
        }
        Ok(any_work)
    }
}
