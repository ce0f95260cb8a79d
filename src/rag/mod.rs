pub mod rag;
pub mod rerank;
pub mod vector;
