use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher13;
use std::hash::{Hash, Hasher};

use crate::models::profile::{CandidateProfile, TargetProfile};
use crate::retrieval::tokenizer::{self, WeightedToken};

// Changing either key changes every embedding; persisted indexes must be rebuilt.
const HASH_SEED_K0: u64 = 0x0123_4567_89ab_cdef;
const HASH_SEED_K1: u64 = 0xfedc_ba98_7654_3210;

pub const DEFAULT_DIMENSION: usize = 256;

/// Fixed-dimension vector for one candidate or posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// Maps postings and candidates into one vector space.
///
/// Implementations must be deterministic: the same profile always yields the
/// same vector, or persisted indexes stop being comparable with fresh queries.
pub trait Embedder: Send + Sync {
    fn name(&self) -> &'static str;

    fn dimension(&self) -> usize;

    fn embed_target(&self, target: &TargetProfile) -> Embedding;

    fn embed_candidate(&self, candidate: &CandidateProfile) -> Embedding;
}

/// Signed feature hashing of weighted tokens, L2 normalized.
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn hash_token(&self, token: &str) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(HASH_SEED_K0, HASH_SEED_K1);
        token.hash(&mut hasher);
        hasher.finish()
    }

    fn tokens_to_embedding(&self, tokens: &[WeightedToken]) -> Embedding {
        let mut vector = vec![0.0f32; self.dimension];

        for wt in tokens {
            let idx = (self.hash_token(&wt.token) % self.dimension as u64) as usize;
            let sign = if self.hash_token(&format!("{}_sign", wt.token)) % 2 == 0 {
                1.0
            } else {
                -1.0
            };
            vector[idx] += sign * wt.weight;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        Embedding(vector)
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

impl Embedder for HashingEmbedder {
    fn name(&self) -> &'static str {
        "hashing-sip13-v1"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_target(&self, target: &TargetProfile) -> Embedding {
        self.tokens_to_embedding(&tokenizer::tokenize_target(target))
    }

    fn embed_candidate(&self, candidate: &CandidateProfile) -> Embedding {
        self.tokens_to_embedding(&tokenizer::tokenize_candidate(candidate))
    }
}
