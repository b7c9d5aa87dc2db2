//! Shader Program Cache
//!
//! Programs are looked up by logical name and compiled on the first miss.
//! Failures are cached too: a name whose sources do not compile maps to the
//! invalid program id until the cache is shut down, so a broken shader is
//! reported once instead of being recompiled every frame.
//!
//! # Example
//!
//! ```ignore
//! let program = cache.get(&mut compiler, "flat", || {
//!     Ok(ShaderStages::inline(FLAT_VS, FLAT_FS, VertexLayout::Pos3Color3))
//! });
//! if program.is_valid() {
//!     // bind and draw
//! }
//! ```

use std::borrow::Cow;
use std::fmt;
use std::path::PathBuf;

use rustc_hash::FxHashMap;

use crate::assets::AssetLoader;

// ============================================================================
// Handles
// ============================================================================

/// Opaque handle to a linked program. `0` means invalid/unlinked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProgramId(u32);

impl ProgramId {
    /// The "unusable program" sentinel
    pub const INVALID: Self = Self(0);

    /// Wrap a raw handle
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw handle value
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check if this refers to a linked program
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

/// Location of a named uniform inside a program (the WGSL binding index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub u32);

/// A cached program entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderProgram {
    id: ProgramId,
    name: String,
}

impl ShaderProgram {
    /// Program handle, possibly [`ProgramId::INVALID`]
    pub fn id(&self) -> ProgramId {
        self.id
    }

    /// Logical name this program is cached under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if the program can be drawn with
    pub fn is_valid(&self) -> bool {
        self.id.is_valid()
    }
}

// ============================================================================
// Sources
// ============================================================================

/// Programmable pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    /// Vertex stage
    Vertex,
    /// Fragment stage
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => write!(f, "vertex"),
            Self::Fragment => write!(f, "fragment"),
        }
    }
}

/// Where a stage's source text comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageSource {
    /// Literal source text
    Inline(Cow<'static, str>),
    /// Path relative to the asset base directory
    File(PathBuf),
}

/// Vertex attribute layout a program is linked against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexLayout {
    /// `vec2` position, `vec3` color
    Pos2Color3,
    /// `vec3` position, `vec3` color
    Pos3Color3,
    /// `vec2` position only (full-screen passes)
    Pos2,
}

/// Everything needed to build one program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderStages {
    /// Vertex stage source
    pub vertex: StageSource,
    /// Fragment stage source
    pub fragment: StageSource,
    /// Vertex input layout
    pub layout: VertexLayout,
}

impl ShaderStages {
    /// Both stages given as literal text
    pub fn inline(
        vertex: impl Into<Cow<'static, str>>,
        fragment: impl Into<Cow<'static, str>>,
        layout: VertexLayout,
    ) -> Self {
        Self {
            vertex: StageSource::Inline(vertex.into()),
            fragment: StageSource::Inline(fragment.into()),
            layout,
        }
    }

    /// Both stages loaded from asset files
    pub fn files(
        vertex: impl Into<PathBuf>,
        fragment: impl Into<PathBuf>,
        layout: VertexLayout,
    ) -> Self {
        Self {
            vertex: StageSource::File(vertex.into()),
            fragment: StageSource::File(fragment.into()),
            layout,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while building a program
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    /// Source text could not be obtained
    Source {
        /// Stage whose source was missing
        stage: ShaderStage,
        /// Reason
        message: String,
    },
    /// A stage failed to compile
    Compile {
        /// Failing stage
        stage: ShaderStage,
        /// Compiler log
        message: String,
    },
    /// Stages compiled but could not be linked
    Link(String),
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source { stage, message } => write!(f, "{stage} source error: {message}"),
            Self::Compile { stage, message } => write!(f, "{stage} compile error: {message}"),
            Self::Link(message) => write!(f, "link error: {message}"),
        }
    }
}

impl std::error::Error for ShaderError {}

// ============================================================================
// Compiler seam
// ============================================================================

/// GPU-side collaborator that turns source text into programs.
pub trait ShaderCompiler {
    /// A compiled, not yet linked stage
    type Stage;

    /// Compile one stage.
    fn compile_stage(&mut self, stage: ShaderStage, source: &str)
    -> Result<Self::Stage, ShaderError>;

    /// Link two compiled stages into a program.
    fn link(
        &mut self,
        name: &str,
        vertex: Self::Stage,
        fragment: Self::Stage,
        layout: VertexLayout,
    ) -> Result<ProgramId, ShaderError>;

    /// Release a program. Unknown ids are ignored.
    fn delete_program(&mut self, id: ProgramId);

    /// Look up a named uniform in a linked program.
    fn uniform_location(&self, id: ProgramId, name: &str) -> Option<UniformLocation>;
}

// ============================================================================
// Cache
// ============================================================================

/// Name → program cache with memoized compilation.
#[derive(Debug)]
pub struct ShaderCache {
    assets: AssetLoader,
    programs: FxHashMap<String, ShaderProgram>,
}

impl ShaderCache {
    /// Create an empty cache reading file sources through `assets`
    pub fn new(assets: AssetLoader) -> Self {
        Self {
            assets,
            programs: FxHashMap::default(),
        }
    }

    /// Asset loader used for file sources
    pub fn assets(&self) -> &AssetLoader {
        &self.assets
    }

    /// Get a program, compiling it on the first request for `name`.
    ///
    /// `provider` is called at most once per name for the lifetime of the
    /// cache. Build failures are logged and cached as an invalid program.
    pub fn get<C, F>(&mut self, compiler: &mut C, name: &str, provider: F) -> &ShaderProgram
    where
        C: ShaderCompiler,
        F: FnOnce() -> Result<ShaderStages, ShaderError>,
    {
        if !self.programs.contains_key(name) {
            let id = match self.build(compiler, name, provider) {
                Ok(id) => {
                    log::info!("Compiled shader program '{name}'");
                    id
                }
                Err(e) => {
                    log::error!("Shader program '{name}' unusable: {e}");
                    ProgramId::INVALID
                }
            };
            self.programs.insert(
                name.to_owned(),
                ShaderProgram {
                    id,
                    name: name.to_owned(),
                },
            );
        }

        &self.programs[name]
    }

    /// Look up an already cached program without compiling
    pub fn lookup(&self, name: &str) -> Option<&ShaderProgram> {
        self.programs.get(name)
    }

    /// Check if `name` has been requested before
    pub fn contains(&self, name: &str) -> bool {
        self.programs.contains_key(name)
    }

    /// Number of cached entries, invalid ones included
    pub fn len(&self) -> usize {
        self.programs.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Delete every valid program and empty the cache
    pub fn shutdown<C: ShaderCompiler>(&mut self, compiler: &mut C) {
        for (_, program) in self.programs.drain() {
            if program.id.is_valid() {
                compiler.delete_program(program.id);
            }
        }
    }

    /// Forget every entry without touching the GPU.
    ///
    /// Only valid once the device that owned the programs is gone.
    pub fn clear(&mut self) {
        self.programs.clear();
    }

    fn build<C, F>(&self, compiler: &mut C, name: &str, provider: F) -> Result<ProgramId, ShaderError>
    where
        C: ShaderCompiler,
        F: FnOnce() -> Result<ShaderStages, ShaderError>,
    {
        let stages = provider()?;
        let vertex_src = self.load(ShaderStage::Vertex, &stages.vertex)?;
        let fragment_src = self.load(ShaderStage::Fragment, &stages.fragment)?;

        let vertex = compiler.compile_stage(ShaderStage::Vertex, &vertex_src)?;
        let fragment = compiler.compile_stage(ShaderStage::Fragment, &fragment_src)?;
        compiler.link(name, vertex, fragment, stages.layout)
    }

    fn load<'a>(&self, stage: ShaderStage, source: &'a StageSource) -> Result<Cow<'a, str>, ShaderError> {
        match source {
            StageSource::Inline(text) => Ok(Cow::Borrowed(text.as_ref())),
            StageSource::File(path) => self
                .assets
                .read_text(path)
                .map(Cow::Owned)
                .map_err(|e| ShaderError::Source {
                    stage,
                    message: e.to_string(),
                }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Compiler that rejects any source containing `error`
    #[derive(Debug, Default)]
    struct FakeCompiler {
        next_id: u32,
        compiled: u32,
        deleted: Vec<ProgramId>,
        uniforms: Vec<(ProgramId, String, u32)>,
    }

    impl ShaderCompiler for FakeCompiler {
        type Stage = String;

        fn compile_stage(&mut self, stage: ShaderStage, source: &str) -> Result<String, ShaderError> {
            self.compiled += 1;
            if source.contains("error") {
                return Err(ShaderError::Compile {
                    stage,
                    message: "syntax error".into(),
                });
            }
            Ok(source.to_owned())
        }

        fn link(
            &mut self,
            _name: &str,
            vertex: String,
            fragment: String,
            _layout: VertexLayout,
        ) -> Result<ProgramId, ShaderError> {
            self.next_id += 1;
            let id = ProgramId::new(self.next_id);
            for (binding, word) in vertex
                .split_whitespace()
                .chain(fragment.split_whitespace())
                .filter(|w| w.starts_with("u_"))
                .enumerate()
            {
                self.uniforms.push((id, word.to_owned(), binding as u32));
            }
            Ok(id)
        }

        fn delete_program(&mut self, id: ProgramId) {
            self.deleted.push(id);
        }

        fn uniform_location(&self, id: ProgramId, name: &str) -> Option<UniformLocation> {
            self.uniforms
                .iter()
                .find(|(p, n, _)| *p == id && n == name)
                .map(|(_, _, b)| UniformLocation(*b))
        }
    }

    fn good_stages() -> ShaderStages {
        ShaderStages::inline("vs u_transform", "fs", VertexLayout::Pos3Color3)
    }

    #[test]
    fn test_program_is_memoized() {
        let mut cache = ShaderCache::new(AssetLoader::default());
        let mut compiler = FakeCompiler::default();
        let calls = Cell::new(0);

        let first = cache
            .get(&mut compiler, "flat", || {
                calls.set(calls.get() + 1);
                Ok(good_stages())
            })
            .id();
        let second = cache
            .get(&mut compiler, "flat", || {
                calls.set(calls.get() + 1);
                Ok(good_stages())
            })
            .id();

        assert!(first.is_valid());
        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);
        assert_eq!(compiler.compiled, 2);
    }

    #[test]
    fn test_compile_failure_is_cached() {
        let mut cache = ShaderCache::new(AssetLoader::default());
        let mut compiler = FakeCompiler::default();
        let calls = Cell::new(0);
        let broken = || {
            calls.set(calls.get() + 1);
            Ok(ShaderStages::inline("vs", "fs error", VertexLayout::Pos2))
        };

        let first = cache.get(&mut compiler, "x", broken).clone();
        let second = cache.get(&mut compiler, "x", broken).clone();

        assert_eq!(calls.get(), 1);
        assert_eq!(first.id(), ProgramId::INVALID);
        assert_eq!(first, second);
        assert!(!second.is_valid());
    }

    #[test]
    fn test_provider_error_is_cached() {
        let mut cache = ShaderCache::new(AssetLoader::default());
        let mut compiler = FakeCompiler::default();

        let program = cache.get(&mut compiler, "missing", || {
            Err(ShaderError::Source {
                stage: ShaderStage::Vertex,
                message: "gone".into(),
            })
        });

        assert!(!program.is_valid());
        assert_eq!(compiler.compiled, 0);
        assert!(cache.contains("missing"));
    }

    #[test]
    fn test_missing_file_source_yields_invalid() {
        let dir = std::env::temp_dir().join(format!("blackhole-{}-nofiles", std::process::id()));
        let mut cache = ShaderCache::new(AssetLoader::new(dir));
        let mut compiler = FakeCompiler::default();

        let program = cache.get(&mut compiler, "rm", || {
            Ok(ShaderStages::files("vs.wgsl", "fs.wgsl", VertexLayout::Pos2))
        });

        assert!(!program.is_valid());
        assert_eq!(compiler.compiled, 0);
    }

    #[test]
    fn test_file_sources_are_read_through_assets() {
        let dir = std::env::temp_dir().join(format!("blackhole-{}-files", std::process::id()));
        std::fs::create_dir_all(dir.join("shaders")).unwrap();
        std::fs::write(dir.join("shaders/a.vs"), "vertex u_time").unwrap();
        std::fs::write(dir.join("shaders/a.fs"), "fragment").unwrap();

        let mut cache = ShaderCache::new(AssetLoader::new(&dir));
        let mut compiler = FakeCompiler::default();
        let id = cache
            .get(&mut compiler, "a", || {
                Ok(ShaderStages::files("shaders/a.vs", "shaders/a.fs", VertexLayout::Pos2))
            })
            .id();

        assert!(id.is_valid());
        assert_eq!(
            compiler.uniform_location(id, "u_time"),
            Some(UniformLocation(0))
        );
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_shutdown_deletes_only_valid_programs() {
        let mut cache = ShaderCache::new(AssetLoader::default());
        let mut compiler = FakeCompiler::default();

        let good = cache.get(&mut compiler, "good", || Ok(good_stages())).id();
        cache.get(&mut compiler, "bad", || {
            Ok(ShaderStages::inline("error", "fs", VertexLayout::Pos2))
        });
        assert_eq!(cache.len(), 2);

        cache.shutdown(&mut compiler);

        assert!(cache.is_empty());
        assert_eq!(compiler.deleted, vec![good]);
    }
}
