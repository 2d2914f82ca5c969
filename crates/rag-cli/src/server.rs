use std::path::PathBuf;

use rag_core::Timestamp;
use rag_store::{
    AssemblerConfig, ContextAssembler, PassageIndex, StoreError, hours_to_window,
    list_history_between, load_history, save_exchange,
};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::*;
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};
use schemars::JsonSchema;
use serde::Deserialize;

/// MCP front end. Holds only the base directory: configuration, directives,
/// template, history and the index are opened fresh on every call.
#[derive(Clone)]
pub struct RagServer {
    base_dir: PathBuf,
    tool_router: ToolRouter<Self>,
}

impl RagServer {
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir,
            tool_router: Self::tool_router(),
        }
    }

    fn config(&self) -> Result<AssemblerConfig, McpError> {
        AssemblerConfig::load(&self.base_dir).map_err(store_error)
    }
}

fn store_error(e: StoreError) -> McpError {
    McpError::internal_error(e.to_string(), None)
}

fn parse_bound(name: &str, raw: Option<&str>) -> Result<Option<Timestamp>, McpError> {
    raw.map(|raw| {
        Timestamp::parse_iso8601(raw).ok_or_else(|| {
            McpError::invalid_params(format!("{name} must be YYYY-MM-DD[THH:MM[:SS]][Z]"), None)
        })
    })
    .transpose()
}

fn json_result(value: serde_json::Value) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(&value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

// --- Tool parameter types ---

#[derive(Debug, Deserialize, JsonSchema)]
struct PromptRequest {
    /// The question to assemble context for
    question: String,
    /// Context budget; defaults to the configured retriever K
    k: Option<usize>,
    /// Include saved exchanges from the last N hours
    history_hours: Option<f64>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
struct HistoryRequest {
    /// Lookback window in hours; defaults to 24 when no range is given
    hours: Option<f64>,
    /// Earliest exchange to list (ISO-8601, UTC), inclusive
    since: Option<String>,
    /// Latest exchange to list (ISO-8601, UTC), inclusive
    until: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SaveExchangeRequest {
    question: String,
    answer: String,
    /// Optional heading for the saved exchange
    title: Option<String>,
    /// Sources the answer cited, usually the `sources` returned by rag_prompt
    sources: Option<Vec<String>>,
}

#[tool_router]
impl RagServer {
    #[tool(
        description = "Assemble a grounded prompt for a question. Retrieves passages from the indexed knowledge base, weighted by the .rag_priorities directives, optionally merges recent conversation, and returns the rendered prompt together with its context and cited sources."
    )]
    async fn rag_prompt(
        &self,
        Parameters(req): Parameters<PromptRequest>,
    ) -> Result<CallToolResult, McpError> {
        if req.question.trim().is_empty() {
            return Err(McpError::invalid_params("question must not be empty", None));
        }
        let mut config = self.config()?;
        if let Some(k) = req.k {
            config = config.with_k(k);
        }
        if let Some(hours) = req.history_hours {
            config = config.with_history_hours(hours);
        }

        let index = PassageIndex::open(&config.index_path).map_err(store_error)?;
        let prompt = ContextAssembler::new(config, index)
            .assemble(&req.question)
            .map_err(store_error)?;
        json_result(crate::prompt_json(&prompt))
    }

    #[tool(
        description = "List saved question/answer exchanges, newest first, with the sources each answer cited. Either give a lookback in hours (default 24) or a since/until date range."
    )]
    async fn rag_history(
        &self,
        Parameters(req): Parameters<HistoryRequest>,
    ) -> Result<CallToolResult, McpError> {
        let since = parse_bound("since", req.since.as_deref())?;
        let until = parse_bound("until", req.until.as_deref())?;
        let ranged = since.is_some() || until.is_some();
        if ranged && req.hours.is_some() {
            return Err(McpError::invalid_params(
                "give either hours or a since/until range, not both",
                None,
            ));
        }

        let config = self.config()?;
        let loaded = if ranged {
            list_history_between(&config.history_dir, &config.base_dir, since, until)
        } else {
            let hours = req.hours.unwrap_or(crate::DEFAULT_HISTORY_HOURS);
            let Some(window) = hours_to_window(hours) else {
                return Err(McpError::invalid_params("hours must be positive", None));
            };
            load_history(&config.history_dir, &config.base_dir, Timestamp::now(), window)
        };
        let exchanges = loaded.map_err(store_error)?;
        json_result(serde_json::json!({
            "count": exchanges.len(),
            "exchanges": exchanges,
        }))
    }

    #[tool(description = "Save a question and its answer to the conversation history so later prompts can draw on it.")]
    async fn rag_save_exchange(
        &self,
        Parameters(req): Parameters<SaveExchangeRequest>,
    ) -> Result<CallToolResult, McpError> {
        let config = self.config()?;
        let path = save_exchange(
            &config.history_dir,
            &req.question,
            &req.answer,
            req.title.as_deref(),
            req.sources.as_deref().unwrap_or_default(),
            Timestamp::now(),
        )
        .map_err(store_error)?;
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        json_result(serde_json::json!({ "file": file }))
    }
}

#[tool_handler]
impl ServerHandler for RagServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Retrieval context assembler over a local markdown knowledge base.\n\n\
                 1. Call rag_prompt with the user's question to get a prompt grounded in the \
                    indexed documents. Answer from that prompt only.\n\
                 2. After answering, call rag_save_exchange with the question, your answer \
                    and the sources rag_prompt returned, so follow-up questions can use it as \
                    recent conversation.\n\
                 3. Use rag_history to review what was asked recently."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
