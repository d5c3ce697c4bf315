//! Hand-written corrections applied by qualified name.
//!
//! A patch directory holds one `<qualified name>.rst` document per module or
//! class to correct, plus an optional `blacklist.txt` listing units to skip
//! entirely (one qualified name per line, `#` starts a comment).

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{NodeId, Tree};
use crate::parser::parse_document;

#[derive(Debug, Default)]
pub struct Patches {
    documents: HashMap<String, Tree>,
    blacklist: HashSet<String>,
}

impl Patches {
    /// No patches and an empty blacklist.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn load(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::Patch {
                path: dir.to_path_buf(),
                reason: "not a directory".to_string(),
            });
        }

        let mut patches = Self::empty();
        let pattern = dir.join("*.rst").to_string_lossy().into_owned();
        let paths = glob::glob(&pattern).map_err(|source| Error::Pattern {
            pattern: pattern.clone(),
            source,
        })?;
        for path in paths {
            let path = path.map_err(|err| Error::Patch {
                path: err.path().to_path_buf(),
                reason: err.to_string(),
            })?;
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let text = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
            patches.insert(name, &text);
        }

        let blacklist = dir.join("blacklist.txt");
        if blacklist.is_file() {
            let text = fs::read_to_string(&blacklist).map_err(|e| Error::io(&blacklist, e))?;
            patches.blacklist = parse_blacklist(&text);
        }

        debug!(
            "loaded {} patches and {} blacklisted names from {}",
            patches.documents.len(),
            patches.blacklist.len(),
            dir.display()
        );
        Ok(patches)
    }

    /// Register the patch document for `name`.
    pub fn insert(&mut self, name: &str, text: &str) {
        self.documents.insert(name.to_string(), parse_document(text));
    }

    pub fn is_blacklisted(&self, name: &str) -> bool {
        self.blacklist.contains(name)
    }

    /// Patch the direct members of `target` with the document for `name`.
    ///
    /// A target member with the same name as a patch member is replaced in
    /// place. Patch members without a counterpart are appended in patch
    /// order. Returns whether a patch exists for `name`.
    pub fn apply(&self, name: &str, tree: &mut Tree, target: NodeId) -> bool {
        let Some(patch) = self.documents.get(name) else {
            return false;
        };
        let replacements = top_level_members(patch);

        let mut existing = HashSet::new();
        for member in tree.members(target) {
            let Some(member_name) = tree.name(member).map(str::to_string) else {
                continue;
            };
            if let Some((_, source)) = replacements.iter().find(|(n, _)| *n == member_name) {
                let copy = tree.graft(patch, *source);
                tree.replace(member, copy);
            }
            existing.insert(member_name);
        }

        let mut added = 0;
        for (member_name, source) in &replacements {
            if existing.contains(member_name) {
                continue;
            }
            let copy = tree.graft(patch, *source);
            tree.append(target, copy);
            added += 1;
        }

        debug!(
            "patched {name}: {} replaced, {added} added",
            replacements.len() - added
        );
        true
    }
}

/// Members of a patch document not nested in another member, in order.
fn top_level_members(patch: &Tree) -> Vec<(String, NodeId)> {
    patch
        .descendants(patch.root())
        .into_iter()
        .filter(|id| patch.node(*id).is_member())
        .filter(|id| !patch.ancestors(*id).any(|a| patch.node(a).is_member()))
        .filter_map(|id| patch.name(id).map(|name| (name.to_string(), id)))
        .collect()
}

fn parse_blacklist(text: &str) -> HashSet<String> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
