//! §4.7 Pairwise Verification: resolves each candidate pair to a
//! [`Verdict`] — reusing the pairwise cache wherever both PRs' hashes still
//! match, asking the chat provider only for the misses.

use std::collections::HashMap;

use models::{Id, PairKey, PairwiseCacheEntry, Pr, TokenUsage, Verdict};
use providers::{ChatMessage, ChatRequest};
use resolver::ChatHandle;
use store::PairLookup;

use crate::detect::CandidatePair;
use crate::error::Result;
use crate::text::{file_paths_text, truncate_chars};

const BODY_CHAR_BUDGET: usize = 1_500;
const MAX_FILE_PATHS_SHOWN: usize = 20;

#[derive(Debug, serde::Deserialize)]
struct RawVerdictPayload {
    is_duplicate: bool,
    confidence: f64,
    relationship: models::Relationship,
    rationale: String,
}

pub struct VerifyOutcome {
    /// verdicts is keyed by [`PairKey::cache_key`] so clique grouping (§4.8)
    /// can look a pair up without recomputing the key.
    pub verdicts: HashMap<String, Verdict>,
    pub usage: TokenUsage,
}

/// build_prompt renders the two-PR comparison prompt: numbers, titles,
/// authors, intent summaries, truncated bodies, and a capped file list.
pub fn build_prompt(a: &Pr, b: &Pr) -> ChatMessage {
    ChatMessage {
        role: "user".to_string(),
        content: format!(
            "Are these two pull requests duplicates? Respond as JSON: \
             {{\"is_duplicate\": bool, \"confidence\": 0..1, \"relationship\": \
             \"exact_duplicate\"|\"near_duplicate\"|\"related\"|\"unrelated\", \"rationale\": \"...\"}}\n\n\
             PR #{}: {} (by {})\nIntent: {}\nBody:\n{}\nFiles:\n{}\n\n\
             PR #{}: {} (by {})\nIntent: {}\nBody:\n{}\nFiles:\n{}",
            a.number,
            a.title,
            a.author,
            a.intent_summary.as_deref().unwrap_or(""),
            truncate_chars(&a.body, BODY_CHAR_BUDGET),
            file_paths_text(&a.file_paths, MAX_FILE_PATHS_SHOWN),
            b.number,
            b.title,
            b.author,
            b.intent_summary.as_deref().unwrap_or(""),
            truncate_chars(&b.body, BODY_CHAR_BUDGET),
            file_paths_text(&b.file_paths, MAX_FILE_PATHS_SHOWN),
        ),
    }
}

/// parse_verdict lifts a chat provider's raw response into a [`Verdict`],
/// or a `parse_error` verdict on malformed JSON — never an error return,
/// per §4.7 step 3: a single pair's malformed response must not abort the
/// phase.
pub fn parse_verdict(response: &serde_json::Value) -> Verdict {
    match serde_json::from_value::<RawVerdictPayload>(response.clone()) {
        Ok(raw) => {
            if raw.is_duplicate {
                Verdict::Positive {
                    confidence: raw.confidence,
                    relationship: raw.relationship,
                    rationale: raw.rationale,
                }
            } else {
                Verdict::Negative {
                    confidence: raw.confidence,
                    relationship: raw.relationship,
                    rationale: raw.rationale,
                }
            }
        }
        Err(err) => Verdict::parse_error(err.to_string()),
    }
}

pub async fn run(
    store: &store::Store,
    chat: &ChatHandle,
    repo_id: Id,
    scan_id: Id,
    prs_by_number: &HashMap<i64, Pr>,
    candidates: &std::collections::BTreeSet<CandidatePair>,
) -> Result<VerifyOutcome> {
    let lookups: Vec<PairLookup> = candidates
        .iter()
        .filter_map(|pair| {
            let a = prs_by_number.get(&pair.a)?;
            let b = prs_by_number.get(&pair.b)?;
            Some(PairLookup {
                pair: PairKey::new(pair.a, pair.b),
                hash_a: a.content_hash(),
                hash_b: b.content_hash(),
            })
        })
        .collect();

    let cached = store.get_pairwise_cache(repo_id, &lookups).await?;

    let misses: Vec<&CandidatePair> = candidates
        .iter()
        .filter(|pair| !cached.contains_key(&PairKey::new(pair.a, pair.b).cache_key()))
        .collect();

    let mut verdicts = cached;
    let mut usage = TokenUsage::new();

    if !misses.is_empty() {
        let requests: Vec<ChatRequest> = misses
            .iter()
            .filter_map(|pair| {
                let a = prs_by_number.get(&pair.a)?;
                let b = prs_by_number.get(&pair.b)?;
                Some(ChatRequest {
                    id: PairKey::new(pair.a, pair.b).cache_key(),
                    messages: vec![build_prompt(a, b)],
                })
            })
            .collect();

        let mut fresh: HashMap<String, Verdict> = HashMap::new();

        match chat.as_batch() {
            Some(batch) => {
                let results = batch.chat_batch(&requests, providers::BatchOptions::default()).await?;
                for item in results {
                    let verdict = match item.result {
                        Ok(response) => {
                            *usage.entry(models::token_key("verify", "input")).or_insert(0) += response.usage.input_tokens;
                            *usage.entry(models::token_key("verify", "output")).or_insert(0) += response.usage.output_tokens;
                            parse_verdict(&response.response)
                        }
                        Err(err) => Verdict::Error { message: err },
                    };
                    fresh.insert(item.id, verdict);
                }
            }
            None => {
                let provider = chat.as_provider();
                for request in &requests {
                    let verdict = match provider.chat(&request.messages).await {
                        Ok(response) => {
                            *usage.entry(models::token_key("verify", "input")).or_insert(0) += response.usage.input_tokens;
                            *usage.entry(models::token_key("verify", "output")).or_insert(0) += response.usage.output_tokens;
                            parse_verdict(&response.response)
                        }
                        Err(err) => Verdict::Error { message: err.to_string() },
                    };
                    fresh.insert(request.id.clone(), verdict);
                }
            }
        }

        let mut entries = Vec::new();
        for pair in &misses {
            let key = PairKey::new(pair.a, pair.b).cache_key();
            if let Some(verdict) = fresh.get(&key) {
                if let (Some(a), Some(b)) = (prs_by_number.get(&pair.a), prs_by_number.get(&pair.b)) {
                    entries.push(PairwiseCacheEntry {
                        repo_id,
                        pair: PairKey::new(pair.a, pair.b),
                        hash_a: a.content_hash(),
                        hash_b: b.content_hash(),
                        verdict: verdict.clone(),
                    });
                }
            }
        }
        store.set_pairwise_cache(&entries).await?;

        verdicts.extend(fresh);
    }

    store.add_token_usage(scan_id, &usage).await?;
    Ok(VerifyOutcome { verdicts, usage })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_verdict_positive() {
        let value = serde_json::json!({
            "is_duplicate": true,
            "confidence": 0.9,
            "relationship": "exact_duplicate",
            "rationale": "same fix",
        });
        assert!(parse_verdict(&value).is_duplicate());
    }

    #[test]
    fn test_parse_verdict_malformed_is_not_fatal() {
        let value = serde_json::json!({"garbage": true});
        let verdict = parse_verdict(&value);
        assert!(!verdict.is_duplicate());
        assert_eq!(verdict.relationship(), models::Relationship::ParseError);
    }

    #[test]
    fn test_build_prompt_mentions_both_pr_numbers() {
        let a = sample_pr(1);
        let b = sample_pr(2);
        let message = build_prompt(&a, &b);
        assert!(message.content.contains("PR #1"));
        assert!(message.content.contains("PR #2"));
    }

    fn sample_pr(number: i64) -> Pr {
        Pr {
            id: Id::new(number),
            repo_id: Id::new(1),
            number,
            title: format!("PR {number}"),
            body: "body".into(),
            author: "alice".into(),
            state: models::PrState::Open,
            file_paths: vec!["a.rs".into()],
            diff_hash: Some("abc".into()),
            updated_at: chrono::Utc::now(),
            embed_hash: None,
            intent_summary: Some("does something".into()),
        }
    }
}
