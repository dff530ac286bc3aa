//! Small pure helpers for building prompts and truncating text to a
//! provider's token budget. Shared by the intent, embedding, and
//! verification phases.

/// truncate_chars keeps the first `max_chars` characters of `text`,
/// appending a marker when it cut something off — cheap stand-in for a
/// real tokenizer-aware truncation, adequate because every downstream
/// consumer re-counts tokens itself before submitting a request.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str(" …[truncated]");
    out
}

/// file_paths_text joins file paths with newlines, capping the number
/// shown so a PR touching thousands of files doesn't blow the prompt
/// budget on its own.
pub fn file_paths_text(paths: &[String], max_paths: usize) -> String {
    let shown = paths.iter().take(max_paths).cloned().collect::<Vec<_>>().join("\n");
    if paths.len() > max_paths {
        format!("{shown}\n… and {} more files", paths.len() - max_paths)
    } else {
        shown
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_truncate_chars_leaves_short_text_untouched() {
        assert_eq!(truncate_chars("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_chars_marks_cut_text() {
        let truncated = truncate_chars("hello world", 5);
        assert!(truncated.starts_with("hello"));
        assert!(truncated.contains("truncated"));
    }

    #[test]
    fn test_file_paths_text_caps_list() {
        let paths: Vec<String> = (0..5).map(|i| format!("f{i}.rs")).collect();
        let text = file_paths_text(&paths, 3);
        assert!(text.contains("f0.rs"));
        assert!(text.contains("2 more files"));
    }
}
