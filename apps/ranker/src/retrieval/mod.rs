// Retrieval: deterministic embeddings, immutable versioned index, Postgres store.

pub mod embedding;
pub mod index;
pub mod similarity;
pub mod store;
pub mod tokenizer;
