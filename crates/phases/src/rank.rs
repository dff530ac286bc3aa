//! §4.9 Ranking: for each duplicate group, asks the chat provider to rank
//! members as if choosing which to merge. Never cached — it runs on every
//! scan, warm or cold, because a group's membership can change scan to scan
//! even when every member PR is individually unchanged.

use std::collections::HashMap;

use models::{DupeGroup, DupeGroupMember, Id, Pr, TokenUsage, Verdict};
use providers::{ChatMessage, ChatRequest};
use resolver::ChatHandle;
use serde::Deserialize;

use crate::clique::Clique;
use crate::error::Result;
use crate::text::truncate_chars;

const BODY_CHAR_BUDGET: usize = 1_500;

#[derive(Debug, Deserialize)]
struct RawRankEntry {
    pr_number: i64,
    score: f64,
    #[serde(default)]
    rationale: String,
}

#[derive(Debug, Deserialize)]
struct RawRankResponse {
    members: Vec<RawRankEntry>,
}

/// build_prompt renders the group's members for the chat provider, asking
/// it to produce a ranked merge recommendation.
pub fn build_prompt(members: &[&Pr]) -> ChatMessage {
    let mut listing = String::new();
    for pr in members {
        listing.push_str(&format!(
            "PR #{}: {}\nIntent: {}\nBody:\n{}\n\n",
            pr.number,
            pr.title,
            pr.intent_summary.as_deref().unwrap_or(""),
            truncate_chars(&pr.body, BODY_CHAR_BUDGET),
        ));
    }
    ChatMessage {
        role: "user".to_string(),
        content: format!(
            "These pull requests are duplicates of one another. Rank them as if choosing \
             which one to merge and close the rest. Respond as JSON: \
             {{\"members\": [{{\"pr_number\": int, \"score\": 0..1, \"rationale\": \"...\"}}]}}\n\n{listing}"
        ),
    }
}

/// parse_ranking turns the provider's response into ranked members, sorted
/// by score descending and deduplicated by PR number (keeping the
/// highest-scoring entry for any number repeated in a malformed response).
pub fn parse_ranking(group_id: Id, response: &serde_json::Value) -> Vec<DupeGroupMember> {
    let parsed: RawRankResponse = match serde_json::from_value(response.clone()) {
        Ok(p) => p,
        Err(_) => return vec![],
    };

    let mut best_by_number: HashMap<i64, RawRankEntry> = HashMap::new();
    for entry in parsed.members {
        best_by_number
            .entry(entry.pr_number)
            .and_modify(|existing| {
                if entry.score > existing.score {
                    *existing = RawRankEntry {
                        pr_number: entry.pr_number,
                        score: entry.score,
                        rationale: entry.rationale.clone(),
                    };
                }
            })
            .or_insert(entry);
    }

    let mut entries: Vec<RawRankEntry> = best_by_number.into_values().collect();
    entries.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| DupeGroupMember {
            group_id,
            pr_number: entry.pr_number,
            rank: (i + 1) as i32,
            score: entry.score,
            rationale: entry.rationale,
        })
        .collect()
}

/// run ranks every clique, writes the resulting groups (replacing whatever
/// this scan previously recorded), and returns the accumulated token usage.
pub async fn run(
    store: &store::Store,
    chat: &ChatHandle,
    scan_id: Id,
    verdicts: &HashMap<String, Verdict>,
    prs_by_number: &HashMap<i64, Pr>,
    cliques: &[Clique],
) -> Result<TokenUsage> {
    store.delete_dupe_groups_by_scan(scan_id).await?;

    let mut usage = TokenUsage::new();
    if cliques.is_empty() {
        store.add_token_usage(scan_id, &usage).await?;
        return Ok(usage);
    }

    let group_ids: Vec<Id> = cliques.iter().map(|_| store::next_id()).collect();

    let requests: Vec<ChatRequest> = cliques
        .iter()
        .zip(&group_ids)
        .map(|(clique, group_id)| {
            let members: Vec<&Pr> = clique.members.iter().filter_map(|n| prs_by_number.get(n)).collect();
            ChatRequest {
                id: group_id.to_string(),
                messages: vec![build_prompt(&members)],
            }
        })
        .collect();

    let mut responses: HashMap<String, serde_json::Value> = HashMap::new();

    match chat.as_batch() {
        Some(batch) if cliques.len() > 1 => {
            let results = batch.chat_batch(&requests, providers::BatchOptions::default()).await?;
            for item in results {
                if let Ok(response) = item.result {
                    *usage.entry(models::token_key("rank", "input")).or_insert(0) += response.usage.input_tokens;
                    *usage.entry(models::token_key("rank", "output")).or_insert(0) += response.usage.output_tokens;
                    responses.insert(item.id, response.response);
                }
            }
        }
        _ => {
            let provider = chat.as_provider();
            for request in &requests {
                if let Ok(response) = provider.chat(&request.messages).await {
                    *usage.entry(models::token_key("rank", "input")).or_insert(0) += response.usage.input_tokens;
                    *usage.entry(models::token_key("rank", "output")).or_insert(0) += response.usage.output_tokens;
                    responses.insert(request.id.clone(), response.response);
                }
            }
        }
    }

    for (clique, group_id) in cliques.iter().zip(&group_ids) {
        let seed_key = models::PairKey::new(clique.seed_pair.0, clique.seed_pair.1).cache_key();
        let relationship = verdicts.get(&seed_key).map(|v| v.relationship()).unwrap_or(models::Relationship::Related);

        let label = prs_by_number
            .get(&clique.members[0])
            .and_then(|pr| pr.intent_summary.clone())
            .unwrap_or_else(|| "Duplicate pull requests".to_string());

        let members = responses
            .get(&group_id.to_string())
            .map(|r| parse_ranking(*group_id, r))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| fallback_ranking(*group_id, clique));

        let group = DupeGroup {
            id: *group_id,
            scan_id,
            label,
            confidence: clique.seed_confidence,
            relationship,
            members,
        };
        store.insert_dupe_group(&group).await?;
    }

    store.add_token_usage(scan_id, &usage).await?;
    Ok(usage)
}

/// fallback_ranking assigns ranks by PR number when the chat provider's
/// response was missing or unusable, so a group is never left unranked.
fn fallback_ranking(group_id: Id, clique: &Clique) -> Vec<DupeGroupMember> {
    let mut numbers = clique.members.clone();
    numbers.sort_unstable();
    numbers
        .into_iter()
        .enumerate()
        .map(|(i, pr_number)| DupeGroupMember {
            group_id,
            pr_number,
            rank: (i + 1) as i32,
            score: 0.0,
            rationale: "ranking unavailable".to_string(),
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_ranking_sorts_by_score_descending() {
        let response = serde_json::json!({
            "members": [
                {"pr_number": 1, "score": 0.4, "rationale": "ok"},
                {"pr_number": 2, "score": 0.9, "rationale": "best"},
            ]
        });
        let members = parse_ranking(Id::new(1), &response);
        assert_eq!(members[0].pr_number, 2);
        assert_eq!(members[0].rank, 1);
        assert_eq!(members[1].rank, 2);
    }

    #[test]
    fn test_parse_ranking_dedupes_by_pr_number() {
        let response = serde_json::json!({
            "members": [
                {"pr_number": 1, "score": 0.4, "rationale": "first"},
                {"pr_number": 1, "score": 0.9, "rationale": "second, higher score"},
            ]
        });
        let members = parse_ranking(Id::new(1), &response);
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].score, 0.9);
    }

    #[test]
    fn test_parse_ranking_malformed_returns_empty() {
        let response = serde_json::json!({"nope": true});
        assert!(parse_ranking(Id::new(1), &response).is_empty());
    }

    #[test]
    fn test_fallback_ranking_assigns_permutation() {
        let clique = Clique {
            members: vec![5, 3, 4],
            seed_confidence: 0.5,
            seed_pair: (3, 4),
        };
        let members = fallback_ranking(Id::new(1), &clique);
        assert_eq!(members.iter().map(|m| m.pr_number).collect::<Vec<_>>(), vec![3, 4, 5]);
        assert_eq!(members.iter().map(|m| m.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
