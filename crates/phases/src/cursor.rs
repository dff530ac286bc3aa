//! Persists an outstanding batch id into a scan's `phase_cursor` the moment
//! a batch provider creates it, not when the batch finally resolves (which
//! may be hours later) — so a process restart in between resumes polling
//! the same batch instead of submitting a new one.

use models::{Id, PhaseCursor};
use store::{ScanStatusUpdate, Store};

/// CursorField names which slot of [`PhaseCursor`] a given phase owns.
/// Only one phase ever writes a given field, and at most one field is
/// meaningful per currently running phase. `Embed` and `EmbedIntent` are
/// the embedding phase's two parallel vector streams (code, intent text);
/// `Intent` belongs solely to intent extraction's chat summarization batch
/// — the two must stay distinct, since the embedding phase resuming
/// `Intent` would hand an embedding provider a foreign chat batch id.
#[derive(Debug, Clone, Copy)]
pub enum CursorField {
    Embed,
    EmbedIntent,
    Intent,
    Verify,
    Rank,
}

impl CursorField {
    fn set(self, cursor: &mut PhaseCursor, batch_id: String) {
        match self {
            CursorField::Embed => cursor.embed_batch_id = Some(batch_id),
            CursorField::EmbedIntent => cursor.embed_intent_batch_id = Some(batch_id),
            CursorField::Intent => cursor.intent_batch_id = Some(batch_id),
            CursorField::Verify => cursor.verify_batch_id = Some(batch_id),
            CursorField::Rank => cursor.rank_batch_id = Some(batch_id),
        }
    }

    fn get(self, cursor: &PhaseCursor) -> Option<String> {
        match self {
            CursorField::Embed => cursor.embed_batch_id.clone(),
            CursorField::EmbedIntent => cursor.embed_intent_batch_id.clone(),
            CursorField::Intent => cursor.intent_batch_id.clone(),
            CursorField::Verify => cursor.verify_batch_id.clone(),
            CursorField::Rank => cursor.rank_batch_id.clone(),
        }
    }
}

/// existing_batch_id reads the currently recorded batch id for `field`, if
/// any — what a resumed phase passes as `BatchOptions::existing_batch_id`.
pub async fn existing_batch_id(store: &Store, scan_id: Id, field: CursorField) -> store::Result<Option<String>> {
    let scan = store.get_scan(scan_id).await?;
    Ok(scan.and_then(|s| field.get(&s.phase_cursor)))
}

/// CursorWriter wraps the non-async `on_batch_created` callback
/// [`providers::BatchOptions`] expects: it hands the newly observed batch id
/// off to a background task (spawned by [`CursorWriter::spawn`]) that
/// awaits it and persists it to the scan row, so the callback itself never
/// blocks on I/O.
pub struct CursorWriter {
    tx: tokio::sync::mpsc::UnboundedSender<String>,
}

impl CursorWriter {
    /// spawn starts the background persister and returns a writer plus its
    /// join handle; callers should await the handle after the batch call
    /// returns to make sure the write (if any) has landed.
    pub fn spawn(store: Store, scan_id: Id, field: CursorField) -> (Self, tokio::task::JoinHandle<()>) {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
        let handle = tokio::spawn(async move {
            let Some(batch_id) = rx.recv().await else {
                return;
            };
            let Ok(Some(scan)) = store.get_scan(scan_id).await else {
                return;
            };
            let mut cursor = scan.phase_cursor.clone();
            field.set(&mut cursor, batch_id);
            let _ = store
                .set_scan_status(
                    scan_id,
                    scan.status,
                    ScanStatusUpdate {
                        phase_cursor: Some(cursor),
                        ..Default::default()
                    },
                )
                .await;
        });
        (Self { tx }, handle)
    }

    /// callback returns the boxed closure to hand to `BatchOptions`.
    pub fn callback(&self) -> Box<dyn FnMut(String) + Send> {
        let tx = self.tx.clone();
        Box::new(move |batch_id| {
            let _ = tx.send(batch_id);
        })
    }
}
