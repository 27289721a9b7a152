//! 带行号工件的解析与切片
//!
//! 工具输出常见 "N: text" 格式（cat -n、grep -n 等）。解析时忽略不匹配的
//! 行（表头、横幅）；按精确行号取范围时若有缺行必须报 IncompleteRange，
//! 绝不静默返回截短的错误结果——缺行意味着上游输出本身被截断了。

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::core::AgentError;

/// IncompleteRange 中最多列出的缺失行号数
const MAX_MISSING_LISTED: usize = 10;

fn line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+):\s?(.*)$").expect("line regex"))
}

/// 解析 "N: text" 块为 {行号: 内容}；不匹配的行直接跳过
pub fn parse_numbered_lines(block_text: &str) -> BTreeMap<u64, String> {
    let mut lines = BTreeMap::new();
    for raw in block_text.lines() {
        if let Some(caps) = line_re().captures(raw) {
            if let Ok(n) = caps[1].parse::<u64>() {
                lines.insert(n, caps[2].to_string());
            }
        }
    }
    lines
}

/// 取 start_line..=end_line 的内容（去掉 "N:" 前缀）。
/// 范围内任何行缺失都报 IncompleteRange（最多列 10 个缺失行号）。
pub fn slice_lines_from_numbered_block(
    block_text: &str,
    start_line: u64,
    end_line: u64,
) -> Result<String, AgentError> {
    if end_line < start_line {
        return Err(AgentError::InvalidRange(format!(
            "end_line {} < start_line {}",
            end_line, start_line
        )));
    }

    let parsed = parse_numbered_lines(block_text);
    let missing: Vec<u64> = (start_line..=end_line)
        .filter(|n| !parsed.contains_key(n))
        .collect();
    if !missing.is_empty() {
        let more = missing.len() > MAX_MISSING_LISTED;
        return Err(AgentError::IncompleteRange {
            missing: missing.into_iter().take(MAX_MISSING_LISTED).collect(),
            more,
        });
    }

    let mut out: Vec<&str> = Vec::with_capacity((end_line - start_line + 1) as usize);
    for n in start_line..=end_line {
        out.push(parsed[&n].as_str());
    }
    Ok(format!("{}\n", out.join("\n").trim_end()))
}

/// 在干净行（去掉 "N:" 前缀后）上做正则检索，返回 (行号, 行内容)。
/// 未给范围时检索全部已解析的行。
pub fn find_matches_in_numbered_block(
    block_text: &str,
    pattern: &str,
    start_line: Option<u64>,
    end_line: Option<u64>,
) -> Result<Vec<(u64, String)>, AgentError> {
    let rx = Regex::new(pattern).map_err(|e| AgentError::InvalidRange(e.to_string()))?;
    let parsed = parse_numbered_lines(block_text);
    let Some((&first, _)) = parsed.iter().next() else {
        return Ok(Vec::new());
    };
    let &last = parsed.keys().next_back().expect("non-empty map");

    let lo = start_line.unwrap_or(first);
    let hi = end_line.unwrap_or(last);
    if lo > hi {
        return Ok(Vec::new());
    }
    Ok(parsed
        .range(lo..=hi)
        .filter(|(_, line)| rx.is_match(line))
        .map(|(&n, line)| (n, line.clone()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: &str = "\
== file dump ==
  1: fn main() {
  2:     println!(\"hi\");
  3: }
  5: // gap above: line 4 truncated upstream
";

    #[test]
    fn test_parse_ignores_banners() {
        let parsed = parse_numbered_lines(BLOCK);
        assert_eq!(parsed.len(), 4);
        assert_eq!(parsed[&1], "fn main() {");
        assert_eq!(parsed[&3], "}");
    }

    #[test]
    fn test_slice_strips_numbering() {
        let sliced = slice_lines_from_numbered_block(BLOCK, 1, 3).unwrap();
        assert_eq!(sliced, "fn main() {\n    println!(\"hi\");\n}\n");
    }

    #[test]
    fn test_missing_line_is_incomplete_range() {
        let err = slice_lines_from_numbered_block(BLOCK, 1, 5).unwrap_err();
        match err {
            AgentError::IncompleteRange { missing, more } => {
                assert_eq!(missing, vec![4]);
                assert!(!more);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_lines_capped_at_ten() {
        let err = slice_lines_from_numbered_block("  1: only line\n", 2, 50).unwrap_err();
        match err {
            AgentError::IncompleteRange { missing, more } => {
                assert_eq!(missing.len(), 10);
                assert_eq!(missing[0], 2);
                assert!(more);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_reversed_range_is_invalid() {
        assert!(matches!(
            slice_lines_from_numbered_block(BLOCK, 3, 1),
            Err(AgentError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_find_matches() {
        let hits = find_matches_in_numbered_block(BLOCK, "println", None, None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, 2);

        let hits = find_matches_in_numbered_block(BLOCK, "println", Some(3), Some(5)).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_find_matches_empty_block() {
        let hits = find_matches_in_numbered_block("banner only", "x", None, None).unwrap();
        assert!(hits.is_empty());
    }
}
