//! Environment-sourced configuration.
//!
//! All settings come from the process environment and are validated once at
//! startup. `EMBEDDING_DIMS` is deliberately required: the collection's
//! dimensionality is fixed at creation time and must match the configured
//! embedding model, so it is never guessed.

use std::str::FromStr;

use anyhow::{bail, Context, Result};

use crate::chunk::{Overlap, DEFAULT_CHUNK_SIZE};

#[derive(Debug, Clone)]
pub struct Config {
    /// Seed URL of the documentation site to ingest.
    pub target_url: String,
    /// Address the HTTP API binds to.
    pub bind_addr: String,
    /// Timeout applied to every outbound HTTP client.
    pub http_timeout_secs: u64,
    pub chunking: ChunkingConfig,
    pub qdrant: QdrantConfig,
    pub embedding: EmbeddingConfig,
    pub completion: CompletionConfig,
}

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub size: usize,
    pub overlap: Overlap,
}

#[derive(Debug, Clone)]
pub struct QdrantConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub api_key: String,
    pub model: String,
    pub dims: usize,
    pub max_retries: u32,
}

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Config {
    /// Load and validate configuration from the environment.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            target_url: required("TARGET_URL")?,
            bind_addr: optional("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:8000".to_string()),
            http_timeout_secs: parsed("HTTP_TIMEOUT_SECS", 30)?,
            chunking: ChunkingConfig {
                size: parsed("CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
                overlap: parsed_with("CHUNK_OVERLAP", Overlap::default())?,
            },
            qdrant: QdrantConfig {
                url: required("QDRANT_URL")?,
                api_key: optional("QDRANT_API_KEY"),
                collection: optional("QDRANT_COLLECTION_NAME")
                    .unwrap_or_else(|| "documentation_chunks".to_string()),
            },
            embedding: EmbeddingConfig {
                api_key: required("COHERE_API_KEY")?,
                model: optional("EMBEDDING_MODEL")
                    .unwrap_or_else(|| "embed-english-v3.0".to_string()),
                dims: parsed_required("EMBEDDING_DIMS")?,
                max_retries: parsed("EMBED_MAX_RETRIES", 5)?,
            },
            completion: CompletionConfig {
                api_key: required("OPENAI_API_KEY")?,
                model: optional("OPENAI_MODEL_NAME")
                    .unwrap_or_else(|| "gpt-4-turbo-preview".to_string()),
                temperature: parsed("OPENAI_TEMPERATURE", 0.7)?,
                max_tokens: parsed("OPENAI_MAX_TOKENS", 1000)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.embedding.dims == 0 {
            bail!("EMBEDDING_DIMS must be > 0");
        }
        if self.chunking.size == 0 {
            bail!("CHUNK_SIZE must be > 0");
        }
        let overlap = self.chunking.overlap.resolve(self.chunking.size);
        if overlap >= self.chunking.size {
            bail!(
                "CHUNK_OVERLAP ({}) must be smaller than CHUNK_SIZE ({})",
                overlap,
                self.chunking.size
            );
        }
        if self.http_timeout_secs == 0 {
            bail!("HTTP_TIMEOUT_SECS must be > 0");
        }
        Ok(())
    }
}

fn required(name: &str) -> Result<String> {
    match optional(name) {
        Some(value) => Ok(value),
        None => bail!("{name} environment variable is required"),
    }
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(name) {
        Some(value) => value
            .parse()
            .with_context(|| format!("invalid value for {name}: {value}")),
        None => Ok(default),
    }
}

fn parsed_required<T: FromStr>(name: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = required(name)?;
    value
        .parse()
        .with_context(|| format!("invalid value for {name}: {value}"))
}

/// Like [`parsed`] for types whose `FromStr` error is already an
/// `anyhow::Error` (the overlap policy).
fn parsed_with<T: FromStr<Err = anyhow::Error>>(name: &str, default: T) -> Result<T> {
    match optional(name) {
        Some(value) => value
            .parse()
            .map_err(|err: anyhow::Error| err.context(format!("invalid value for {name}: {value}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            target_url: "https://docs.example/".to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            http_timeout_secs: 30,
            chunking: ChunkingConfig {
                size: 512,
                overlap: Overlap::Chars(100),
            },
            qdrant: QdrantConfig {
                url: "http://localhost:6333".to_string(),
                api_key: None,
                collection: "documentation_chunks".to_string(),
            },
            embedding: EmbeddingConfig {
                api_key: "test-key".to_string(),
                model: "embed-english-v3.0".to_string(),
                dims: 1024,
                max_retries: 5,
            },
            completion: CompletionConfig {
                api_key: "test-key".to_string(),
                model: "gpt-4-turbo-preview".to_string(),
                temperature: 0.7,
                max_tokens: 1000,
            },
        }
    }

    #[test]
    fn valid_config_passes_validation() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn zero_dims_is_rejected() {
        let mut config = test_config();
        config.embedding.dims = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn overlap_not_smaller_than_size_is_rejected() {
        let mut config = test_config();
        config.chunking.overlap = Overlap::Chars(512);
        assert!(config.validate().is_err());

        config.chunking.overlap = Overlap::Fraction(0.2);
        assert!(config.validate().is_ok());
    }
}
