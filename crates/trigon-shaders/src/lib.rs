//! SPIR-V shader loading for the Trigon renderer.
//!
//! The build script compiles `shaders/shader.{vert,frag}` to SPIR-V next to
//! the sources. At runtime this crate only reads and validates the bytecode.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// First word of every SPIR-V module.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Default location of the compiled vertex shader, relative to the working directory.
pub const DEFAULT_VERTEX_SHADER: &str = "shaders/vert.spv";
/// Default location of the compiled fragment shader, relative to the working directory.
pub const DEFAULT_FRAGMENT_SHADER: &str = "shaders/frag.spv";

#[derive(Error, Debug)]
pub enum ShaderError {
    #[error("Failed to open shader {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Shader {} is {len} bytes, not a multiple of 4", path.display())]
    Misaligned { path: PathBuf, len: usize },
    #[error("Shader {} has invalid SPIR-V magic number {magic:#010x}", path.display())]
    InvalidMagic { path: PathBuf, magic: u32 },
}

pub type Result<T> = std::result::Result<T, ShaderError>;

/// Paths of the two shader stages used by the triangle pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPaths {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl Default for ShaderPaths {
    fn default() -> Self {
        Self {
            vertex: PathBuf::from(DEFAULT_VERTEX_SHADER),
            fragment: PathBuf::from(DEFAULT_FRAGMENT_SHADER),
        }
    }
}

impl ShaderPaths {
    /// Look for `vert.spv` and `frag.spv` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            vertex: dir.join("vert.spv"),
            fragment: dir.join("frag.spv"),
        }
    }
}

/// Read a whole file into memory.
pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|source| ShaderError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a compiled SPIR-V module and convert it to words for Vulkan.
pub fn load_spirv(path: impl AsRef<Path>) -> Result<Vec<u32>> {
    let path = path.as_ref();
    let bytes = read_file(path)?;
    let words = bytes_to_spirv(path, &bytes)?;
    tracing::debug!("Loaded shader {} ({} words)", path.display(), words.len());
    Ok(words)
}

/// Convert byte slice to aligned u32 Vec (SPIR-V requires 4-byte alignment).
fn bytes_to_spirv(path: &Path, bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.len() % 4 != 0 {
        return Err(ShaderError::Misaligned {
            path: path.to_path_buf(),
            len: bytes.len(),
        });
    }

    let words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    match words.first() {
        Some(&SPIRV_MAGIC) => Ok(words),
        other => Err(ShaderError::InvalidMagic {
            path: path.to_path_buf(),
            magic: other.copied().unwrap_or(0),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn spirv_file(words: &[u32]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for word in words {
            file.write_all(&word.to_le_bytes()).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn loads_valid_module() {
        let file = spirv_file(&[SPIRV_MAGIC, 0x0001_0000, 0, 1, 0]);
        let words = load_spirv(file.path()).unwrap();
        assert_eq!(words.len(), 5);
        assert_eq!(words[0], SPIRV_MAGIC);
        assert_eq!(words[1], 0x0001_0000);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_spirv(dir.path().join("vert.spv")).unwrap_err();
        assert!(matches!(err, ShaderError::Io { .. }));
        assert!(err.to_string().contains("vert.spv"));
    }

    #[test]
    fn rejects_truncated_module() {
        let mut file = spirv_file(&[SPIRV_MAGIC]);
        file.write_all(&[0xAB, 0xCD]).unwrap();
        file.flush().unwrap();
        let err = load_spirv(file.path()).unwrap_err();
        assert!(matches!(err, ShaderError::Misaligned { len: 6, .. }));
    }

    #[test]
    fn rejects_wrong_magic() {
        let file = spirv_file(&[0xDEAD_BEEF, 0]);
        let err = load_spirv(file.path()).unwrap_err();
        assert!(matches!(err, ShaderError::InvalidMagic { magic: 0xDEAD_BEEF, .. }));
    }

    #[test]
    fn empty_file_has_no_magic() {
        let file = NamedTempFile::new().unwrap();
        let err = load_spirv(file.path()).unwrap_err();
        assert!(matches!(err, ShaderError::InvalidMagic { magic: 0, .. }));
    }

    #[test]
    fn read_file_returns_all_bytes() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        file.flush().unwrap();
        assert_eq!(read_file(file.path()).unwrap(), b"abc");
    }

    #[test]
    fn shader_paths_in_dir() {
        let paths = ShaderPaths::in_dir("assets/shaders");
        assert_eq!(paths.vertex, Path::new("assets/shaders/vert.spv"));
        assert_eq!(paths.fragment, Path::new("assets/shaders/frag.spv"));
        assert_eq!(ShaderPaths::default().vertex, Path::new(DEFAULT_VERTEX_SHADER));
    }

    #[test]
    fn build_script_produces_loadable_shaders() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../shaders");
        let paths = ShaderPaths::in_dir(&dir);
        for path in [&paths.vertex, &paths.fragment] {
            let words = load_spirv(path).unwrap();
            assert_eq!(words[0], SPIRV_MAGIC);
            // Header is five words, then at least one instruction.
            assert!(words.len() > 5);
        }
    }
}
