//! Mapping node identifiers to attachment directories.
//!
//! An identifier is turned into a relative path by the first strategy in an
//! ordered list that produces one. Long flat directories are avoided by
//! splitting a prefix off the identifier, similar to how content-addressed
//! stores shard their objects.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use tracing::trace;

use crate::error::AttachError;
use crate::fs::ops::{FsResult, is_dir};

/// Split `id` after its first `n` characters.
///
/// Returns `None` unless the remainder is non-empty.
fn split_prefix(id: &str, n: usize) -> Option<String> {
    let (at, _) = id.char_indices().nth(n)?;
    Some(format!("{}/{}", &id[..at], &id[at..]))
}

/// `"abcdef"` → `"ab/cdef"`; identifiers of two characters or fewer yield `None`.
pub fn uuid_folder_format(id: &str) -> Option<String> {
    split_prefix(id, 2)
}

/// `"2024011"` → `"202401/1"`; the six-character prefix is a year and month.
pub fn ts_folder_format(id: &str) -> Option<String> {
    split_prefix(id, 6)
}

/// `"x"` → `"__/x/x"`. Only the empty identifier yields `None`.
pub fn fallback_folder_format(id: &str) -> Option<String> {
    let first = id.chars().next()?;
    Some(format!("__/{first}/{id}"))
}

/// Custom strategy function.
pub type IdFormatFn = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// A named way of deriving a relative path from an identifier.
#[derive(Clone)]
pub enum IdStrategy {
    UuidFolder,
    TsFolder,
    Fallback,
    Custom { name: String, format: IdFormatFn },
}

impl IdStrategy {
    pub fn custom(
        name: impl Into<String>,
        format: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        IdStrategy::Custom {
            name: name.into(),
            format: Arc::new(format),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            IdStrategy::UuidFolder => "uuid-folder",
            IdStrategy::TsFolder => "ts-folder",
            IdStrategy::Fallback => "fallback",
            IdStrategy::Custom { name, .. } => name,
        }
    }

    /// Apply the strategy; an empty result counts as no result.
    pub fn apply(&self, id: &str) -> Option<PathBuf> {
        let formatted = match self {
            IdStrategy::UuidFolder => uuid_folder_format(id),
            IdStrategy::TsFolder => ts_folder_format(id),
            IdStrategy::Fallback => fallback_folder_format(id),
            IdStrategy::Custom { format, .. } => format(id),
        }?;
        if formatted.is_empty() {
            return None;
        }
        Some(formatted.split('/').filter(|c| !c.is_empty()).collect())
    }

    /// The strategies tried when none are configured.
    pub fn defaults() -> Vec<IdStrategy> {
        vec![IdStrategy::UuidFolder, IdStrategy::TsFolder, IdStrategy::Fallback]
    }
}

impl fmt::Debug for IdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdStrategy({})", self.name())
    }
}

impl FromStr for IdStrategy {
    type Err = AttachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uuid-folder" => Ok(IdStrategy::UuidFolder),
            "ts-folder" => Ok(IdStrategy::TsFolder),
            "fallback" => Ok(IdStrategy::Fallback),
            other => Err(AttachError::invalid_config("id-to-path", other)),
        }
    }
}

impl<'de> Deserialize<'de> for IdStrategy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// Resolves identifiers to directories under a base directory.
#[derive(Debug, Clone)]
pub struct IdResolver {
    base: PathBuf,
    fallback_base: Option<PathBuf>,
    strategies: Vec<IdStrategy>,
}

impl IdResolver {
    pub fn new(base: impl Into<PathBuf>, strategies: Vec<IdStrategy>) -> Self {
        Self {
            base: base.into(),
            fallback_base: None,
            strategies,
        }
    }

    /// Secondary base searched by [`get_existing_from_id`](Self::get_existing_from_id).
    #[must_use]
    pub fn with_fallback_base(mut self, fallback_base: impl Into<PathBuf>) -> Self {
        self.fallback_base = Some(fallback_base.into());
        self
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Path from the first strategy that produces one, without checking that
    /// it exists.
    pub fn get_from_id(&self, id: &str) -> Option<PathBuf> {
        self.strategies
            .iter()
            .find_map(|strategy| strategy.apply(id))
            .map(|relative| self.base.join(relative))
    }

    /// First candidate directory that exists.
    ///
    /// Every strategy's candidate is checked under the primary base, then under
    /// the fallback base, before moving on to the next strategy.
    pub async fn get_existing_from_id(&self, id: &str) -> FsResult<Option<PathBuf>> {
        for strategy in &self.strategies {
            let Some(relative) = strategy.apply(id) else {
                continue;
            };
            let bases = std::iter::once(&self.base).chain(self.fallback_base.as_ref());
            for base in bases {
                let candidate = base.join(&relative);
                if is_dir(&candidate).await? {
                    trace!(strategy = strategy.name(), path = %candidate.display(), "ID directory found");
                    return Ok(Some(candidate));
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_uuid_folder_format() {
        assert_eq!(uuid_folder_format("ab"), None);
        assert_eq!(uuid_folder_format("abc").as_deref(), Some("ab/c"));
        assert_eq!(uuid_folder_format("abcdef").as_deref(), Some("ab/cdef"));
    }

    #[test]
    fn test_ts_folder_format() {
        assert_eq!(ts_folder_format("202401"), None);
        assert_eq!(ts_folder_format("2024011").as_deref(), Some("202401/1"));
        assert_eq!(
            ts_folder_format("20240115T103000.000000").as_deref(),
            Some("202401/15T103000.000000")
        );
    }

    #[test]
    fn test_fallback_folder_format() {
        assert_eq!(fallback_folder_format("x").as_deref(), Some("__/x/x"));
        assert_eq!(fallback_folder_format(""), None);
    }

    #[test]
    fn test_formats_count_characters() {
        assert_eq!(uuid_folder_format("éé"), None);
        assert_eq!(uuid_folder_format("ééé").as_deref(), Some("éé/é"));
    }

    #[test]
    fn test_get_from_id_uses_first_match() {
        let resolver = IdResolver::new("/base", IdStrategy::defaults());
        assert_eq!(
            resolver.get_from_id("abcdef"),
            Some(PathBuf::from("/base/ab/cdef"))
        );
        // Too short for the first two strategies
        assert_eq!(resolver.get_from_id("a"), Some(PathBuf::from("/base/__/a/a")));
        assert_eq!(resolver.get_from_id(""), None);
    }

    #[test]
    fn test_custom_strategy_empty_result_skipped() {
        let strategies = vec![
            IdStrategy::custom("never", |_| Some(String::new())),
            IdStrategy::TsFolder,
        ];
        let resolver = IdResolver::new("/base", strategies);
        assert_eq!(
            resolver.get_from_id("2024011"),
            Some(PathBuf::from("/base/202401/1"))
        );
    }

    #[test]
    fn test_strategy_names_parse() {
        for name in ["uuid-folder", "ts-folder", "fallback"] {
            let strategy: IdStrategy = name.parse().unwrap();
            assert_eq!(strategy.name(), name);
        }
        let err = "md5".parse::<IdStrategy>().unwrap_err();
        assert!(matches!(err, AttachError::InvalidConfiguration { option: "id-to-path", .. }));
    }

    #[tokio::test]
    async fn test_get_existing_from_id_searches_fallback_base() {
        let primary = TempDir::new().unwrap();
        let secondary = TempDir::new().unwrap();
        let resolver = IdResolver::new(primary.path(), IdStrategy::defaults())
            .with_fallback_base(secondary.path());

        assert_eq!(resolver.get_existing_from_id("abcdef").await.unwrap(), None);

        // Only the fallback bucket exists, and only under the secondary base
        let bucket = secondary.path().join("__/a/abcdef");
        std::fs::create_dir_all(&bucket).unwrap();
        assert_eq!(
            resolver.get_existing_from_id("abcdef").await.unwrap(),
            Some(bucket)
        );

        // An earlier strategy under the primary base wins
        let preferred = primary.path().join("ab/cdef");
        std::fs::create_dir_all(&preferred).unwrap();
        assert_eq!(
            resolver.get_existing_from_id("abcdef").await.unwrap(),
            Some(preferred)
        );
    }
}
