//! Batched inserts/deletes (§4.9). Accumulates tasks in two queues; a run
//! phase emits a single SPARQL-style UPDATE combining a `DELETE WHERE`
//! block (wildcards become fresh variables) with `INSERT DATA`.

use std::mem;
use std::sync::Mutex;

use async_trait::async_trait;
use ldkit_value::Value;
use tokio::sync::oneshot;

use crate::connection::TripleStoreConnection;
use crate::error::StoreError;
use crate::worker::Worker;

/// A quad-shaped task. `None` in any slot is a wildcard, valid only for
/// deletions.
#[derive(Debug, Clone, Default)]
pub struct Task {
    pub resource: Option<String>,
    pub predicate: Option<String>,
    pub value: Option<Value>,
}

struct Pending {
    task: Task,
    reply: oneshot::Sender<()>,
}

#[derive(Default)]
pub struct Updater {
    insertions: Mutex<Vec<Pending>>,
    deletions: Mutex<Vec<Pending>>,
}

impl Updater {
    pub fn new() -> Updater {
        Updater::default()
    }

    pub fn insert(&self, task: Task) -> oneshot::Receiver<()> {
        Updater::enqueue(&self.insertions, task)
    }

    pub fn delete(&self, task: Task) -> oneshot::Receiver<()> {
        Updater::enqueue(&self.deletions, task)
    }

    fn enqueue(queue: &Mutex<Vec<Pending>>, task: Task) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        queue.lock().unwrap().push(Pending { task, reply: tx });
        rx
    }

    pub fn pending_count(&self) -> usize {
        self.insertions.lock().unwrap().len() + self.deletions.lock().unwrap().len()
    }
}

fn literal(value: &Value) -> String {
    match value {
        Value::Uri(uri) => format!("<{uri}>"),
        other => format!("{:?}", other.encode(None)),
    }
}

fn delete_pattern(task: &Task, variable_seed: usize) -> String {
    let subject = task.resource.as_deref().map(|r| format!("<{r}>")).unwrap_or_else(|| format!("?s{variable_seed}"));
    let predicate = task.predicate.as_deref().map(|p| format!("<{p}>")).unwrap_or_else(|| format!("?p{variable_seed}"));
    let object = task.value.as_ref().map(literal).unwrap_or_else(|| format!("?o{variable_seed}"));
    format!("{subject} {predicate} {object} .")
}

fn insert_triple(task: &Task) -> Option<String> {
    let subject = task.resource.as_deref()?;
    let predicate = task.predicate.as_deref()?;
    let object = task.value.as_ref()?;
    Some(format!("<{subject}> <{predicate}> {} .", literal(object)))
}

#[async_trait]
impl Worker for Updater {
    #[tracing::instrument(level = "debug", skip(self, connection))]
    async fn run(&self, connection: &dyn TripleStoreConnection) -> Result<bool, StoreError> {
        let insertions: Vec<Pending> = mem::take(&mut *self.insertions.lock().unwrap());
        let deletions: Vec<Pending> = mem::take(&mut *self.deletions.lock().unwrap());

        if insertions.is_empty() && deletions.is_empty() {
            return Ok(false);
        }

        let mut update = String::new();

        if !deletions.is_empty() {
            let patterns: Vec<String> =
                deletions.iter().enumerate().map(|(index, pending)| delete_pattern(&pending.task, index)).collect();
            update.push_str("DELETE WHERE { ");
            update.push_str(&patterns.join(" "));
            update.push_str(" } ");
            if !insertions.is_empty() {
                update.push_str("; ");
            }
        }

        if !insertions.is_empty() {
            let triples: Vec<String> = insertions.iter().filter_map(|pending| insert_triple(&pending.task)).collect();
            update.push_str("INSERT DATA { ");
            update.push_str(&triples.join(" "));
            update.push_str(" }");
        }

        connection.update(&update).await?;

        for pending in insertions.into_iter().chain(deletions) {
            let _ = pending.reply.send(());
        }

        Ok(true)
    }

    fn name(&self) -> &'static str {
        "updater"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryTripleStore;

    #[tokio::test]
    async fn insertions_and_deletions_emit_a_single_update() {
        let updater = Updater::new();
        let rx_insert = updater.insert(Task {
            resource: Some("urn:a".to_owned()),
            predicate: Some("p:name".to_owned()),
            value: Some(Value::string("alice")),
        });
        let rx_delete = updater.delete(Task { resource: Some("urn:b".to_owned()), predicate: None, value: None });

        let store = MemoryTripleStore::new();
        assert!(updater.run(&store).await.unwrap());

        let log = store.update_log();
        assert_eq!(log.len(), 1);
        assert!(log[0].contains("DELETE WHERE"));
        assert!(log[0].contains("INSERT DATA"));

        rx_insert.await.unwrap();
        rx_delete.await.unwrap();
    }

    #[tokio::test]
    async fn empty_queues_report_no_work() {
        let updater = Updater::new();
        let store = MemoryTripleStore::new();
        assert!(!updater.run(&store).await.unwrap());
    }
}
