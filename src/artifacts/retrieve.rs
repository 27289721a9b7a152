//! retrieve_artifact：注入每个工具清单的合成工具
//!
//! 不经网关、由调度器本地执行：按引用取回工件内容，可选行（字节）范围。
//! schema 提供 OpenAI function 全量格式与 pre-think 用的紧凑格式两种。

use serde_json::{json, Value};

use crate::artifacts::{ArtifactRef, ArtifactStore, ContentKind};
use crate::core::AgentError;

/// 合成工具名
pub const RETRIEVE_ARTIFACT_TOOL: &str = "retrieve_artifact";

/// OpenAI function calling 格式的 schema（situation 的工具清单用）
pub fn retrieve_artifact_tool_schema() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": RETRIEVE_ARTIFACT_TOOL,
            "description": "Return the content of a stored artifact by ref (artifact:<id>). A line range may be requested.",
            "parameters": {
                "type": "object",
                "properties": {
                    "ref": {
                        "type": "string",
                        "description": "Reference of the form artifact:<id>",
                    },
                    "start_line": {
                        "type": "integer",
                        "description": "First line (1-indexed) of the slice to extract.",
                    },
                    "end_line": {
                        "type": "integer",
                        "description": "Last line (inclusive) of the slice to extract.",
                    },
                },
                "required": ["ref"],
            },
        },
    })
}

/// 紧凑格式 schema（pre-think 的工具清单用）
pub fn retrieve_artifact_mini_schema() -> Value {
    json!({
        "name": RETRIEVE_ARTIFACT_TOOL,
        "description": "Return the content of a stored artifact by ref (artifact:<id>). A line range may be requested.",
        "parameters": ["ref", "start_line", "end_line"],
    })
}

/// 本地执行 retrieve_artifact：读切片并包为结构化结果
pub fn retrieve_artifact(
    store: &ArtifactStore,
    r: &str,
    start_line: Option<u64>,
    end_line: Option<u64>,
) -> Result<Value, AgentError> {
    let artifact_ref = ArtifactRef::from_ref(r);
    let (meta, content) = store.read_slice(&artifact_ref, start_line, end_line)?;
    let content_kind = match meta.content_kind {
        ContentKind::Text => "text",
        ContentKind::Binary => "binary",
    };
    Ok(json!({
        "ref": artifact_ref.to_string(),
        "content_kind": content_kind,
        "size": meta.size,
        "summary": meta.summary,
        "content": content.render(),
        "slice": {
            "start_line": start_line,
            "end_line": end_line,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retrieve_full_and_slice() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let r = store.save_text("a\nb\nc", Some("abc")).unwrap();

        let full = retrieve_artifact(&store, &r.to_string(), None, None).unwrap();
        assert_eq!(full["content"], "a\nb\nc");
        assert_eq!(full["content_kind"], "text");
        assert_eq!(full["summary"], "abc");

        let sliced = retrieve_artifact(&store, &r.to_string(), Some(2), Some(2)).unwrap();
        assert_eq!(sliced["content"], "b");
        assert_eq!(sliced["slice"]["start_line"], 2);
    }

    #[test]
    fn test_retrieve_unknown_ref() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path()).unwrap();
        let err = retrieve_artifact(&store, "artifact:missing", None, None).unwrap_err();
        assert!(matches!(err, AgentError::ArtifactNotFound(_)));
    }

    #[test]
    fn test_schema_shape() {
        let schema = retrieve_artifact_tool_schema();
        assert_eq!(schema["function"]["name"], RETRIEVE_ARTIFACT_TOOL);
        assert_eq!(schema["function"]["parameters"]["required"], json!(["ref"]));
    }
}
