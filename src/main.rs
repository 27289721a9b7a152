//! Wasp - 有界上下文的自主任务执行器
//!
//! 入口：初始化日志、加载配置、组装 TaskRunner 并运行命令行给出的任务。

use std::sync::Arc;

use anyhow::Context;

use wasp::config::load_config;
use wasp::gateway::McpClient;
use wasp::llm::{LlmClient, OpenAiClient};
use wasp::rag::{InMemoryLongTerm, LongTermMemory, NoopLongTerm};
use wasp::react::TaskRunner;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    wasp::observability::init();

    let cfg = load_config(None).unwrap_or_default();

    let task = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    if task.trim().is_empty() {
        anyhow::bail!("usage: wasp <task description>");
    }

    let llm = Arc::new(OpenAiClient::new(
        cfg.llm.base_url.as_deref(),
        &cfg.llm.model,
        cfg.llm.api_key.as_deref(),
    ));
    let gateway = Arc::new(
        McpClient::new(&cfg.gateway.url, cfg.gateway.request_timeout_secs)
            .context("failed to build MCP client")?,
    );
    if let Err(e) = gateway.initialize().await {
        tracing::warn!(error = %e, "MCP initialize failed, tool calls may be rejected");
    }
    let long_term: Arc<dyn LongTermMemory> = if cfg.memory.enabled {
        Arc::new(InMemoryLongTerm::new(cfg.memory.max_entries))
    } else {
        Arc::new(NoopLongTerm)
    };

    let runner = TaskRunner::new(llm.clone(), gateway, long_term, cfg)
        .context("failed to build task runner")?;

    let report = runner.run(&task).await;

    let (prompt, completion, total) = llm.token_usage();
    tracing::info!(
        outcome = ?report.outcome,
        steps = report.steps,
        prompt_tokens = prompt,
        completion_tokens = completion,
        total_tokens = total,
        "run finished"
    );
    if let Some(summary) = report.summary {
        println!("{}", summary);
    }

    Ok(())
}
