//! §4.4 Intent Extraction: summarizes what each PR does in 2-3 sentences,
//! the highest-signal input to both embedding (§4.5) and pairwise
//! verification (§4.7). Never used for ranking.

use std::collections::HashMap;

use models::{Id, Pr, TokenUsage};
use providers::{BatchOptions, ChatMessage, ChatRequest};
use resolver::ChatHandle;
use serde::Deserialize;

use crate::cursor::{self, CursorField, CursorWriter};
use crate::error::Result;
use crate::text::{file_paths_text, truncate_chars};

const BODY_CHAR_BUDGET: usize = 2_000;
const MAX_FILE_PATHS_SHOWN: usize = 20;

#[derive(Debug, Deserialize)]
struct IntentResponse {
    summary: String,
}

/// build_prompt renders the prompt the chat provider sees for one PR: its
/// title, a truncated body, and either its diff or file paths (whichever
/// the caller has on hand — the engine always has file paths, the diff is
/// optional per §3's `diff_hash` contract).
pub fn build_prompt(pr: &Pr) -> ChatMessage {
    let body = truncate_chars(&pr.body, BODY_CHAR_BUDGET);
    let files = file_paths_text(&pr.file_paths, MAX_FILE_PATHS_SHOWN);
    ChatMessage {
        role: "user".to_string(),
        content: format!(
            "Summarize what this pull request does in 2-3 sentences. Respond as JSON: {{\"summary\": \"...\"}}\n\n\
             Title: {}\n\nBody:\n{body}\n\nFiles changed:\n{files}",
            pr.title,
        ),
    }
}

/// parse_summary lifts the chat provider's raw JSON into the 2-3 sentence
/// summary text, or `None` on a malformed response — callers record that as
/// an empty/unset summary rather than aborting the phase (§7: a malformed
/// per-item response is never fatal to the whole phase).
pub fn parse_summary(response: &serde_json::Value) -> Option<String> {
    serde_json::from_value::<IntentResponse>(response.clone())
        .ok()
        .map(|r| r.summary)
}

/// run extracts an intent summary for every PR in `prs` whose cache is
/// stale, skipping PRs whose `embed_hash` already matches their current
/// content hash (§4.4: "PRs whose stored embed_hash already matches ... are
/// skipped entirely"). Token usage is accumulated under `intent.{input,output}`.
pub async fn run(store: &store::Store, chat: &ChatHandle, scan_id: Id, prs: &[Pr]) -> Result<TokenUsage> {
    let stale: Vec<&Pr> = prs.iter().filter(|pr| !pr.is_cache_fresh()).collect();
    if stale.is_empty() {
        return Ok(TokenUsage::new());
    }

    let requests: Vec<ChatRequest> = stale
        .iter()
        .map(|pr| ChatRequest {
            id: pr.number.to_string(),
            messages: vec![build_prompt(pr)],
        })
        .collect();

    let mut usage = TokenUsage::new();

    match chat.as_batch() {
        Some(batch) => {
            let existing = cursor::existing_batch_id(store, scan_id, CursorField::Intent).await?;
            let (writer, writer_handle) = CursorWriter::spawn(store.clone(), scan_id, CursorField::Intent);
            let results = batch
                .chat_batch(
                    &requests,
                    BatchOptions {
                        existing_batch_id: existing,
                        on_batch_created: Some(writer.callback()),
                    },
                )
                .await?;
            drop(writer);
            let _ = writer_handle.await;

            let mut by_id: HashMap<String, _> = results.into_iter().map(|r| (r.id.clone(), r)).collect();
            for pr in &stale {
                if let Some(item) = by_id.remove(&pr.number.to_string()) {
                    apply_result(store, &mut usage, pr, item.result).await?;
                }
            }
        }
        None => {
            let provider = chat.as_provider();
            for pr in &stale {
                let request = build_prompt(pr);
                let result = provider.chat(&[request]).await.map_err(|e| e.to_string());
                apply_result(store, &mut usage, pr, result).await?;
            }
        }
    }

    store.add_token_usage(scan_id, &usage).await?;
    Ok(usage)
}

async fn apply_result(
    store: &store::Store,
    usage: &mut TokenUsage,
    pr: &Pr,
    result: std::result::Result<providers::ChatResponse, String>,
) -> Result<()> {
    match result {
        Ok(response) => {
            *usage.entry(models::token_key("intent", "input")).or_insert(0) += response.usage.input_tokens;
            *usage.entry(models::token_key("intent", "output")).or_insert(0) += response.usage.output_tokens;

            let summary = parse_summary(&response.response).unwrap_or_default();
            store.update_pr_intent_summary(pr.id, &summary).await?;
        }
        Err(err) => {
            tracing::warn!(pr = pr.number, error = %err, "intent extraction failed for PR, leaving summary unset");
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_pr() -> Pr {
        Pr {
            id: Id::new(1),
            repo_id: Id::new(1),
            number: 7,
            title: "Fix login timeout".into(),
            body: "The session expired too quickly under load.".into(),
            author: "alice".into(),
            state: models::PrState::Open,
            file_paths: vec!["src/auth.rs".into()],
            diff_hash: Some("abc".into()),
            updated_at: chrono::Utc::now(),
            embed_hash: None,
            intent_summary: None,
        }
    }

    #[test]
    fn test_build_prompt_includes_title_and_files() {
        let message = build_prompt(&sample_pr());
        assert!(message.content.contains("Fix login timeout"));
        assert!(message.content.contains("src/auth.rs"));
    }

    #[test]
    fn test_parse_summary_extracts_text() {
        let value = serde_json::json!({"summary": "Fixes a login timeout bug."});
        assert_eq!(parse_summary(&value), Some("Fixes a login timeout bug.".to_string()));
    }

    #[test]
    fn test_parse_summary_is_none_on_malformed_json() {
        let value = serde_json::json!({"unexpected": "shape"});
        assert_eq!(parse_summary(&value), None);
    }
}
