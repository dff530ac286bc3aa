//! §4.8 Clique Grouping: turns the set of confirmed-positive pairwise
//! verdicts into a partition of PRs where every member of a group is
//! pairwise confirmed with every other member. Deliberately not a
//! union-find over positive edges — that would produce transitive
//! clusters and silently merge unrelated PRs through a shared neighbor.

use std::collections::{HashMap, HashSet};

use models::Verdict;

/// Edge is one confirmed-positive verdict, reduced to what the algorithm
/// needs: the pair and its confidence.
#[derive(Debug, Clone, Copy)]
struct Edge {
    a: i64,
    b: i64,
    confidence: f64,
}

/// Clique is one emitted group: its members (in admission order) and the
/// confidence/edge that seeded it.
#[derive(Debug, Clone)]
pub struct Clique {
    pub members: Vec<i64>,
    pub seed_confidence: f64,
    pub seed_pair: (i64, i64),
}

/// build runs the greedy maximum-clique extraction of §4.8 over every
/// confirmed-positive entry in `verdicts` (keyed by [`PairKey::cache_key`]).
/// Pairs whose verdict is not [`Verdict::Positive`] never participate.
pub fn build(verdicts: &HashMap<String, Verdict>) -> Vec<Clique> {
    let confirmed: HashMap<(i64, i64), f64> = verdicts
        .iter()
        .filter_map(|(key, verdict)| {
            let Verdict::Positive { confidence, .. } = verdict else {
                return None;
            };
            parse_key(key).map(|(a, b)| ((a, b), *confidence))
        })
        .collect();

    let mut edges: Vec<Edge> = confirmed
        .iter()
        .map(|(&(a, b), &confidence)| Edge { a, b, confidence })
        .collect();

    // Descending confidence; ties broken by (min PR number, max PR number) ascending.
    edges.sort_by(|x, y| {
        y.confidence
            .partial_cmp(&x.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| x.a.cmp(&y.a))
            .then_with(|| x.b.cmp(&y.b))
    });

    let mut used: HashSet<i64> = HashSet::new();
    let mut groups = Vec::new();

    for edge in &edges {
        if used.contains(&edge.a) || used.contains(&edge.b) {
            continue;
        }

        let mut group = vec![edge.a, edge.b];
        used.insert(edge.a);
        used.insert(edge.b);

        loop {
            let candidates_remaining: Vec<i64> = confirmed
                .keys()
                .flat_map(|&(a, b)| [a, b])
                .filter(|n| !used.contains(n))
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();

            let mut admission: Option<(i64, f64)> = None;
            for &candidate in &candidates_remaining {
                let Some(min_confidence) = min_confidence_to_group(&confirmed, candidate, &group) else {
                    continue;
                };
                let better = match admission {
                    None => true,
                    Some((_, best)) => min_confidence > best,
                };
                if better {
                    admission = Some((candidate, min_confidence));
                }
            }

            match admission {
                Some((candidate, _)) => {
                    group.push(candidate);
                    used.insert(candidate);
                }
                None => break,
            }
        }

        groups.push(Clique {
            members: group,
            seed_confidence: edge.confidence,
            seed_pair: (edge.a, edge.b),
        });
    }

    groups
}

/// min_confidence_to_group returns the minimum confidence among the edges
/// from `candidate` to every member of `group`, or `None` if any member
/// lacks a confirmed edge to `candidate` — disqualifying it per §4.8 step 4.
fn min_confidence_to_group(confirmed: &HashMap<(i64, i64), f64>, candidate: i64, group: &[i64]) -> Option<f64> {
    let mut min = f64::INFINITY;
    for &member in group {
        let key = if candidate < member {
            (candidate, member)
        } else {
            (member, candidate)
        };
        let confidence = *confirmed.get(&key)?;
        min = min.min(confidence);
    }
    Some(min)
}

fn parse_key(key: &str) -> Option<(i64, i64)> {
    let (a, b) = key.split_once('-')?;
    Some((a.parse().ok()?, b.parse().ok()?))
}

#[cfg(test)]
mod test {
    use super::*;

    fn positive(conf: f64) -> Verdict {
        Verdict::Positive {
            confidence: conf,
            relationship: models::Relationship::NearDuplicate,
            rationale: "similar".into(),
        }
    }

    fn negative() -> Verdict {
        Verdict::Negative {
            confidence: 0.1,
            relationship: models::Relationship::Unrelated,
            rationale: "different".into(),
        }
    }

    #[test]
    fn test_non_transitive_trio_yields_single_pair_group() {
        // A-B confirmed 0.88, B-C confirmed 0.82, A-C not confirmed (S4).
        let mut verdicts = HashMap::new();
        verdicts.insert("1-2".to_string(), positive(0.88));
        verdicts.insert("2-3".to_string(), positive(0.82));
        verdicts.insert("1-3".to_string(), negative());

        let groups = build(&verdicts);

        assert_eq!(groups.len(), 1);
        let group = &groups[0];
        assert_eq!(group.members.len(), 2);
        assert!(group.members.contains(&1));
        assert!(group.members.contains(&2));
        assert!(!group.members.contains(&3));
    }

    #[test]
    fn test_full_triangle_forms_one_group_of_three() {
        let mut verdicts = HashMap::new();
        verdicts.insert("1-2".to_string(), positive(0.9));
        verdicts.insert("2-3".to_string(), positive(0.85));
        verdicts.insert("1-3".to_string(), positive(0.8));

        let groups = build(&verdicts);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members.len(), 3);
    }

    #[test]
    fn test_disjoint_pairs_yield_two_groups() {
        let mut verdicts = HashMap::new();
        verdicts.insert("1-2".to_string(), positive(0.9));
        verdicts.insert("3-4".to_string(), positive(0.7));

        let groups = build(&verdicts);
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_negative_only_yields_no_groups() {
        let mut verdicts = HashMap::new();
        verdicts.insert("1-2".to_string(), negative());
        assert!(build(&verdicts).is_empty());
    }

    #[test]
    fn test_highest_confidence_edge_is_seeded_first() {
        let mut verdicts = HashMap::new();
        verdicts.insert("1-2".to_string(), positive(0.5));
        verdicts.insert("3-4".to_string(), positive(0.95));

        let groups = build(&verdicts);
        assert_eq!(groups[0].seed_pair, (3, 4));
    }
}
