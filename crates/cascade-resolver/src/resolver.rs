//! Chain discovery and the root-to-leaf fold.

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use cascade_merge::{merge_body, merge_mapping, merge_sequence, BodyStrategy, SequenceStrategy};
use cascade_parser::frontmatter::{EXAMPLES, EXTENDS, MERGE};
use cascade_parser::{Frontmatter, SpecFile, SPEC_SUFFIX};
use cascade_types::{Mapping, Value};
use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

use crate::config::ResolverConfig;
use crate::discovery::AncestorDiscovery;
use crate::error::{ChainError, ChainResult};
use crate::path::{is_within, normalize};
use crate::resolved::ResolvedConfig;
use crate::source::{FsSource, SpecSource};

/// Key of a per-file `merge` declaration that targets the body.
const BODY_KEY: &str = "body";

/// Resolves leaf specs into [`ResolvedConfig`]s.
///
/// A resolver holds no per-resolution state, so one instance can serve any
/// number of leaves, concurrently if needed.
pub struct Resolver {
    config: ResolverConfig,
    discovery: Box<dyn AncestorDiscovery>,
    source: Box<dyn SpecSource>,
}

impl Resolver {
    /// Resolver over the local filesystem using the configured discovery rule.
    pub fn new(config: ResolverConfig) -> Self {
        let discovery = config.discovery.build();
        Self {
            config,
            discovery,
            source: Box::new(FsSource),
        }
    }

    /// Replace the spec source.
    pub fn with_source(mut self, source: impl SpecSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    /// Replace the discovery rule built from the config.
    pub fn with_discovery(mut self, discovery: impl AncestorDiscovery + 'static) -> Self {
        self.discovery = Box::new(discovery);
        self
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Load the spec chain for `leaf`, root ancestor first.
    ///
    /// Every file's `merge` declarations are validated here, so a chain that
    /// loads can always be folded.
    pub fn load_chain(&self, leaf: &Path) -> ChainResult<Vec<SpecFile>> {
        let boundary = self.config.workspace_root.as_deref().map(normalize);
        let mut current = normalize(leaf);
        let mut referenced_by: Option<PathBuf> = None;
        let mut seen = HashSet::new();
        let mut visited: Vec<PathBuf> = Vec::new();
        let mut files = Vec::new();

        loop {
            if !seen.insert(current.clone()) {
                visited.push(current.clone());
                return Err(ChainError::Cycle {
                    path: current,
                    chain: visited,
                });
            }
            visited.push(current.clone());

            let spec = self.load_file(&current, referenced_by.as_deref())?;
            declared_strategies(&spec)?;
            let ancestor = self.discovery.ancestor_of(&spec, self.source.as_ref());
            files.push(spec);

            let Some(ancestor) = ancestor.map(|p| normalize(&p)) else {
                break;
            };
            if let Some(root) = &boundary {
                if !is_within(&ancestor, root) {
                    debug!(
                        ancestor = %ancestor.display(),
                        root = %root.display(),
                        "ancestor outside workspace; chain ends"
                    );
                    break;
                }
            }
            trace!(child = %current.display(), ancestor = %ancestor.display(), "following ancestor");
            referenced_by = Some(std::mem::replace(&mut current, ancestor));
        }

        files.reverse();
        debug!(leaf = %leaf.display(), depth = files.len(), "loaded spec chain");
        Ok(files)
    }

    /// Resolve one leaf spec.
    pub fn resolve(&self, leaf: impl AsRef<Path>) -> ChainResult<ResolvedConfig> {
        let chain = self.load_chain(leaf.as_ref())?;
        self.fold(chain)
    }

    /// Resolve independent leaves in parallel.
    ///
    /// At most `available_parallelism` threads run, the caller's included,
    /// each taking the next unclaimed leaf. Results come back in input order;
    /// one leaf failing does not affect the others.
    pub fn resolve_many<P>(&self, leaves: &[P]) -> Vec<ChainResult<ResolvedConfig>>
    where
        P: AsRef<Path> + Sync,
    {
        let workers = thread::available_parallelism()
            .map_or(1, NonZeroUsize::get)
            .min(leaves.len());
        let next = AtomicUsize::new(0);
        let work = || {
            let mut done = Vec::new();
            loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                let Some(leaf) = leaves.get(index) else {
                    break;
                };
                done.push((index, self.resolve(leaf)));
            }
            done
        };

        let mut results = thread::scope(|scope| {
            let handles: Vec<_> = (1..workers)
                .filter_map(|n| {
                    thread::Builder::new()
                        .name(format!("cascade-resolve-{n}"))
                        .spawn_scoped(scope, &work)
                        .map_err(|err| debug!(error = %err, "resolver worker not started"))
                        .ok()
                })
                .collect();
            // Leaves left unclaimed by a worker that failed to start are
            // picked up here.
            let mut results = work();
            for handle in handles {
                results.extend(
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic)),
                );
            }
            results
        });
        results.sort_unstable_by_key(|(index, _)| *index);
        results.into_iter().map(|(_, result)| result).collect()
    }

    /// List the leaf specs under `dir` on the local filesystem.
    ///
    /// Hidden directories and the configured base file are skipped. Paths are
    /// returned sorted.
    pub fn discover_leaves(&self, dir: &Path) -> ChainResult<Vec<PathBuf>> {
        let base = self.config.discovery.base_file_name();
        let mut leaves = Vec::new();
        let walker = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

        for entry in walker {
            let entry = entry.map_err(|err| {
                let path = err.path().map_or_else(|| dir.to_path_buf(), Path::to_path_buf);
                ChainError::Read {
                    path,
                    source: io::Error::from(err),
                }
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let is_leaf = match entry.file_name().to_str() {
                Some(name) => name.ends_with(SPEC_SUFFIX) && Some(name) != base,
                None => false,
            };
            if is_leaf {
                leaves.push(entry.into_path());
            }
        }
        Ok(leaves)
    }

    fn load_file(&self, path: &Path, referenced_by: Option<&Path>) -> ChainResult<SpecFile> {
        let raw = self.source.read_to_string(path).map_err(|source| match referenced_by {
            Some(child) if source.kind() == io::ErrorKind::NotFound => ChainError::MissingAncestor {
                path: path.to_path_buf(),
                referenced_by: child.to_path_buf(),
            },
            _ => ChainError::Read {
                path: path.to_path_buf(),
                source,
            },
        })?;
        SpecFile::parse(path, &raw).map_err(|source| ChainError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn fold(&self, chain: Vec<SpecFile>) -> ChainResult<ResolvedConfig> {
        let Some((root, rest)) = chain.split_first() else {
            unreachable!("load_chain always yields the leaf");
        };

        let mut fields = inheritable(root.frontmatter());
        let mut body = root.body().to_string();
        let mut examples = root.examples().to_vec();

        for child in rest {
            let declared = declared_strategies(child)?;
            let strategy_for = |path: &str| {
                declared
                    .fields
                    .get(path)
                    .copied()
                    .unwrap_or_else(|| self.config.strategy_for_field(path))
            };
            let examples_strategy = declared
                .fields
                .get(EXAMPLES)
                .or_else(|| self.config.field_strategies.get(EXAMPLES))
                .copied()
                .unwrap_or(self.config.examples_strategy);
            let body_strategy = declared.body.unwrap_or(self.config.body_strategy);

            fields = merge_mapping(&fields, &inheritable(child.frontmatter()), strategy_for);
            examples = merge_sequence(&examples, child.examples(), examples_strategy);
            body = merge_body(&body, child.body(), body_strategy);
            trace!(spec = %child.path().display(), ?examples_strategy, ?body_strategy, "folded");
        }

        Ok(ResolvedConfig {
            frontmatter: Frontmatter::from_mapping(fields),
            body,
            examples,
            chain,
        })
    }
}

/// Strategies a spec declares for the step where it is folded in as child.
#[derive(Debug, Default)]
struct Declared {
    body: Option<BodyStrategy>,
    fields: BTreeMap<String, SequenceStrategy>,
}

fn declared_strategies(spec: &SpecFile) -> ChainResult<Declared> {
    let mut declared = Declared::default();
    // The parser leaves a `merge` value it cannot type in `extra`.
    if let Some(raw) = spec.frontmatter().extra.get(MERGE) {
        if !raw.is_null() {
            return Err(ChainError::MalformedMerge {
                path: spec.path().to_path_buf(),
                reason: malformed_merge_reason(raw),
            });
        }
    }
    let Some(merge) = &spec.frontmatter().merge else {
        return Ok(declared);
    };
    for (field, name) in merge {
        let invalid = |source| ChainError::InvalidStrategy {
            path: spec.path().to_path_buf(),
            field: field.clone(),
            source,
        };
        if field == BODY_KEY {
            declared.body = Some(name.parse().map_err(invalid)?);
        } else {
            declared
                .fields
                .insert(field.clone(), name.parse().map_err(invalid)?);
        }
    }
    Ok(declared)
}

fn malformed_merge_reason(raw: &Value) -> String {
    let Some(map) = raw.as_mapping() else {
        return format!("expected a mapping, found {}", raw.type_name());
    };
    match map.iter().find(|(_, v)| v.as_str().is_none()) {
        Some((field, value)) => format!(
            "field {field:?} holds {}, expected a strategy name",
            value.type_name()
        ),
        None => "expected strategy names".to_string(),
    }
}

/// Frontmatter fields that flow down the chain.
fn inheritable(frontmatter: &Frontmatter) -> Mapping {
    let mut map = frontmatter.to_mapping();
    for directive in [EXTENDS, MERGE, EXAMPLES] {
        map.remove(directive);
    }
    map
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}
