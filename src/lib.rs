pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod llm;
pub mod models;
pub mod rag;
pub mod server;

use agent::AIAgent;
use cli::Args;
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr);
    info!("TLS Enabled: {}", args.enable_tls);
    info!("Session Store Type: {}", args.history_type);
    info!("Session Store Host: {}", args.history_host);
    info!("History Window: {}", args.history_window);
    info!("Chat LLM Type: {}", args.chat_llm_type);
    info!("Embedding LLM Type: {}", args.embedding_llm_type);
    info!("Embedding Dimension: {}", args.dimension);
    info!("Vector Store Host: {}", args.host);
    info!("Vector Collection: {}", args.indexes);
    info!("Retrieve Limit: {}", args.rag_default_limit);
    info!("Rerank Top K: {}", args.rerank_top_k);
    info!("Contexts Shown: {}", args.context_count);
    info!("Prompts Path: {}", args.prompts_path.as_deref().unwrap_or("built-in"));
    info!("-------------------------");

    let agent = Arc::new(AIAgent::new(args.clone()).await?);
    let addr = args.server_addr.clone();
    let server = Server::new(addr, agent, args);
    server.run().await?;

    Ok(())
}
