use crate::core::{
    compile::{CompiledQuery, Compiler},
    config::Config,
    error::Error,
    model::{MetadataProvider, ModelCache, SchemaDef},
    query::{FlatCodec, FlatMap, Query},
};
use std::{path::Path, sync::Arc};

///
/// Engine
///
/// Public facade pairing a validated [`Config`] with the compiler and flat
/// codec built from it. Every entry point converts stage errors into
/// [`Error`].
///

#[derive(Clone, Debug)]
pub struct Engine {
    config: Config,
    codec: FlatCodec,
    compiler: Compiler,
}

impl Engine {
    /// Build an engine over `provider` with a private metadata cache.
    pub fn new(provider: impl MetadataProvider + 'static, config: Config) -> Result<Self, Error> {
        Self::with_models(Arc::new(ModelCache::new(provider)), config)
    }

    /// Build an engine sharing an existing metadata cache.
    pub fn with_models(models: Arc<ModelCache>, config: Config) -> Result<Self, Error> {
        config.validate()?;
        tracing::debug!(
            default_limit = config.query.default_limit,
            root_alias = %config.compile.root_alias,
            "engine configured"
        );

        Ok(Self {
            codec: FlatCodec::new(config.query.default_limit),
            compiler: Compiler::from_config(models, &config),
            config,
        })
    }

    /// Load a TOML schema and an optional TOML config from disk.
    pub fn load(schema: impl AsRef<Path>, config: Option<&Path>) -> Result<Self, Error> {
        let schema = SchemaDef::load(schema)?;
        let config = match config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        Self::new(schema, config)
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn models(&self) -> &Arc<ModelCache> {
        self.compiler.models()
    }

    //
    // Front end
    //

    /// Parse rich query text into a request.
    pub fn parse(&self, text: &str) -> Result<Query, Error> {
        Ok(Query::parse(text)?)
    }

    /// Decode a flat key/values map, applying the configured default limit.
    pub fn decode(&self, map: &FlatMap) -> Result<Query, Error> {
        Ok(self.codec.decode(map)?)
    }

    /// Encode a request as a flat map, falling back to `q` when needed.
    pub fn encode(&self, query: &Query) -> Result<FlatMap, Error> {
        Ok(self.codec.encode(query)?)
    }

    /// Render a request as rich query text.
    pub fn print(&self, query: &Query) -> Result<String, Error> {
        Ok(query.to_query_text()?)
    }

    //
    // Compilation
    //

    pub fn compile(&self, entity: &str, query: &Query) -> Result<CompiledQuery, Error> {
        Ok(self.compiler.compile(entity, query)?)
    }

    pub fn compile_text(&self, entity: &str, text: &str) -> Result<CompiledQuery, Error> {
        let query = self.parse(text)?;

        self.compile(entity, &query)
    }

    pub fn compile_flat(&self, entity: &str, map: &FlatMap) -> Result<CompiledQuery, Error> {
        let query = self.decode(map)?;

        self.compile(entity, &query)
    }
}
