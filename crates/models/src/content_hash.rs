use sha2::{Digest, Sha256};

/// ContentHash is the short digest that gates recomputation of a PR's
/// embeddings, intent summary, and pairwise verdicts. Two PRs with equal
/// hashes are, for detection purposes, identical.
///
/// It's a truncated SHA-256 of the tuple `(diff_hash, title, body,
/// sorted file paths)` — collision-resistant enough to use as a cache key,
/// short enough to show up in logs without wrapping.
#[derive(Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "sqlx-support", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx-support", sqlx(transparent))]
pub struct ContentHash(String);

const HASH_LEN: usize = 16;

impl ContentHash {
    pub fn compute(diff_hash: Option<&str>, title: &str, body: &str, file_paths: &[String]) -> Self {
        let mut sorted_paths = file_paths.to_vec();
        sorted_paths.sort_unstable();

        let mut hasher = Sha256::new();
        hasher.update(diff_hash.unwrap_or("").as_bytes());
        hasher.update(b"\0");
        hasher.update(title.as_bytes());
        hasher.update(b"\0");
        hasher.update(body.as_bytes());
        hasher.update(b"\0");
        hasher.update(sorted_paths.join("\0").as_bytes());

        let digest = hasher.finalize();
        let hex = hex::encode(digest);
        Self(hex[..HASH_LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContentHash({})", self.0)
    }
}

/// normalize_diff strips volatile metadata from a unified diff so cosmetic
/// churn — line-number shifts in hunk headers caused by unrelated earlier
/// edits — doesn't invalidate the content hash or pairwise cache.
pub fn normalize_diff(diff: &str) -> String {
    diff.lines()
        .map(strip_hunk_header_line_numbers)
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_hunk_header_line_numbers(line: &str) -> String {
    if !line.starts_with("@@") {
        return line.to_string();
    }
    let Some(end) = line[2..].find("@@").map(|i| i + 2) else {
        return line.to_string();
    };
    format!("@@ ... @@{}", &line[end + 2..])
}

/// diff_hash computes the [`ContentHash`]-style digest of a normalized diff.
/// It's stored verbatim on the PR row as `diff_hash`.
pub fn diff_hash(diff: &str) -> String {
    let normalized = normalize_diff(diff);
    let digest = Sha256::digest(normalized.as_bytes());
    hex::encode(digest)[..HASH_LEN].to_string()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_hash_is_stable_for_identical_inputs() {
        let a = ContentHash::compute(
            Some("abc"),
            "Fix login timeout",
            "body",
            &["a.rs".to_string(), "b.rs".to_string()],
        );
        let b = ContentHash::compute(
            Some("abc"),
            "Fix login timeout",
            "body",
            &["b.rs".to_string(), "a.rs".to_string()],
        );
        assert_eq!(a, b, "file path order must not affect the hash");
    }

    #[test]
    fn test_hash_changes_with_title() {
        let a = ContentHash::compute(Some("abc"), "Fix login timeout", "body", &[]);
        let b = ContentHash::compute(Some("abc"), "Fix login bug", "body", &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_normalize_diff_strips_hunk_line_numbers() {
        let diff = "@@ -10,7 +10,8 @@ fn foo() {\n-old\n+new\n";
        let a = normalize_diff(diff);
        let diff_shifted = "@@ -50,7 +51,8 @@ fn foo() {\n-old\n+new\n";
        let b = normalize_diff(diff_shifted);
        assert_eq!(a, b);
    }

    #[test]
    fn test_diff_hash_ignores_line_number_churn() {
        let a = diff_hash("@@ -10,7 +10,8 @@ fn foo() {\n-old\n+new\n");
        let b = diff_hash("@@ -50,7 +51,8 @@ fn foo() {\n-old\n+new\n");
        assert_eq!(a, b);
    }
}
