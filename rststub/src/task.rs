//! Unit orchestration: source files → task tree → stubs on disk.
//!
//! `bge.types.KX_GameObject.rst` lands at `bge` → `types` → `KX_GameObject`.
//! Segments starting with an upper-case letter (or named with
//! `--class-name`) are class units whose classes are grafted into the parent
//! module. Everything else is a module unit rendered to its own file.
//!
//! Children run before their parent. Siblings run in parallel.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use tracing::{debug, error, info};

use crate::assembly::{assemble, promote_members};
use crate::error::{Error, Result};
use crate::model::{Module, Node, NodeId, Tree};
use crate::parser::parse_document;
use crate::patch::Patches;
use crate::render::{create_renderer, Renderer};

/// Settings for a batch run.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// Directory holding the `.rst` sources.
    pub input: PathBuf,
    /// Directory receiving the generated stubs.
    pub output: PathBuf,
    /// File name pattern matched inside `input`.
    pub pattern: String,
    pub patches: Option<PathBuf>,
    /// `stub` or `json`.
    pub format: String,
    /// Extra segment or qualified names to treat as class units.
    pub class_names: Vec<String>,
    /// Worker threads; 0 picks one per core.
    pub jobs: usize,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("."),
            output: PathBuf::from("."),
            pattern: "*.rst".to_string(),
            patches: None,
            format: "stub".to_string(),
            class_names: Vec::new(),
            jobs: 0,
        }
    }
}

/// Unit totals of a finished batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitKind {
    Module,
    Class,
}

/// A node of the task tree. The root has an empty name.
#[derive(Debug)]
pub struct Task {
    name: String,
    full_name: String,
    kind: UnitKind,
    source: Option<PathBuf>,
    children: BTreeMap<String, Task>,
}

/// What a finished unit hands to its parent.
enum Output {
    Module(String),
    Class(Tree),
    Nothing,
}

struct Context<'a> {
    output: &'a Path,
    patches: &'a Patches,
    renderer: &'a dyn Renderer,
    total: usize,
    successful: AtomicUsize,
    failed: AtomicUsize,
}

impl Context<'_> {
    fn done(&self) -> usize {
        self.successful.load(Ordering::Relaxed) + self.failed.load(Ordering::Relaxed)
    }
}

impl Task {
    fn root() -> Self {
        Self {
            name: String::new(),
            full_name: String::new(),
            kind: UnitKind::Module,
            source: None,
            children: BTreeMap::new(),
        }
    }

    /// Build the task tree from the files in `config.input` matching
    /// `config.pattern`, leaving out blacklisted names.
    pub fn discover(config: &GenerateConfig, patches: &Patches) -> Result<Self> {
        let pattern = config.input.join(&config.pattern).to_string_lossy().into_owned();
        let paths = glob::glob(&pattern).map_err(|source| Error::Pattern {
            pattern: pattern.clone(),
            source,
        })?;

        let mut files: Vec<PathBuf> = paths.filter_map(|p| p.ok()).filter(|p| p.is_file()).collect();
        files.sort();

        let class_names: HashSet<&str> = config.class_names.iter().map(String::as_str).collect();
        let mut root = Self::root();
        for path in files {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if patches.is_blacklisted(stem) {
                info!("skipping blacklisted {stem}");
                continue;
            }
            let segments: Vec<&str> = stem.split('.').filter(|s| !s.is_empty()).collect();
            if segments.is_empty() {
                continue;
            }
            root.resolve(&segments, &class_names).source = Some(path.clone());
        }
        Ok(root)
    }

    fn resolve(&mut self, path: &[&str], class_names: &HashSet<&str>) -> &mut Task {
        let Some((first, rest)) = path.split_first() else {
            return self;
        };
        let full_name = if self.full_name.is_empty() {
            first.to_string()
        } else {
            format!("{}.{first}", self.full_name)
        };
        let child = self.children.entry(first.to_string()).or_insert_with(|| {
            let class_like = first.starts_with(|c: char| c.is_uppercase())
                || class_names.contains(first)
                || class_names.contains(full_name.as_str());
            Task {
                name: first.to_string(),
                kind: if class_like { UnitKind::Class } else { UnitKind::Module },
                full_name,
                source: None,
                children: BTreeMap::new(),
            }
        });
        child.resolve(rest, class_names)
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Units in this subtree, excluding the root.
    pub fn total(&self) -> usize {
        usize::from(!self.name.is_empty()) + self.children.values().map(Task::total).sum::<usize>()
    }

    fn has_submodule(&self) -> bool {
        self.children.values().any(|c| c.kind == UnitKind::Module)
    }

    /// Where this module unit's stub goes below `output`.
    fn target_path(&self, output: &Path, extension: &str) -> PathBuf {
        let segments: Vec<&str> = self.full_name.split('.').collect();
        let top_level = segments.len() == 1;
        if top_level || self.has_submodule() {
            let mut path = output.to_path_buf();
            path.extend(&segments);
            path.join(format!("__init__.{extension}"))
        } else {
            let mut path = output.to_path_buf();
            path.extend(&segments[..segments.len() - 1]);
            path.join(format!("{}.{extension}", self.name))
        }
    }

    fn run(&self, ctx: &Context) -> Output {
        let children: Vec<(&Task, Output)> = self
            .children
            .par_iter()
            .map(|(_, child)| (child, child.run(ctx)))
            .collect();

        if self.name.is_empty() {
            return Output::Nothing;
        }

        let result = match self.kind {
            UnitKind::Class => match &self.source {
                Some(path) => self.run_class(path),
                None => return Output::Nothing,
            },
            UnitKind::Module => {
                info!(
                    "processing {} ({} of {})",
                    self.full_name,
                    ctx.done() + 1,
                    ctx.total
                );
                self.run_module(children, ctx)
            }
        };

        match result {
            Ok(output) => {
                ctx.successful.fetch_add(1, Ordering::Relaxed);
                output
            }
            Err(err) => {
                error!("{}: {err}", self.full_name);
                ctx.failed.fetch_add(1, Ordering::Relaxed);
                Output::Nothing
            }
        }
    }

    fn run_class(&self, path: &Path) -> Result<Output> {
        debug!("parsing class unit {}", path.display());
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let tree = parse_document(&text);

        // Diagnostics nested in classes travel with them to the module.
        let source = path.display().to_string();
        let root = tree.root();
        for id in tree.descendants(root) {
            if let Node::Message(diagnostic) = tree.node(id) {
                if !tree.ancestors(id).any(|a| matches!(tree.node(a), Node::Class(_))) {
                    diagnostic.emit(&source);
                }
            }
        }
        Ok(Output::Class(tree))
    }

    fn run_module(&self, children: Vec<(&Task, Output)>, ctx: &Context) -> Result<Output> {
        let (mut tree, source) = match &self.source {
            Some(path) => {
                debug!("parsing module unit {}", path.display());
                let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
                (parse_document(&text), path.display().to_string())
            }
            None => {
                debug!("synthesizing empty module {}", self.full_name);
                let mut tree = Tree::new();
                let root = tree.root();
                tree.append_new(root, Node::Module(Module::new(&self.full_name)));
                (tree, self.full_name.clone())
            }
        };

        let mut fragments = Vec::new();
        let mut submodules = Vec::new();
        for (child, output) in children {
            match output {
                Output::Class(fragment) => fragments.push(fragment),
                Output::Module(name) => submodules.push(name),
                Output::Nothing => debug!("{}: nothing from {}", self.full_name, child.full_name),
            }
        }

        let module = build_module(&mut tree, &source, ctx.patches, &fragments)?;
        assemble(&mut tree, module, &submodules);

        let rendered = ctx.renderer.render(&tree, &source);
        let target = self.target_path(ctx.output, ctx.renderer.file_extension());
        write_stub(&target, &rendered)?;
        debug!("wrote {}", target.display());

        Ok(Output::Module(self.full_name.clone()))
    }
}

/// Promote, patch and merge class fragments into the document's module.
fn build_module(
    tree: &mut Tree,
    source: &str,
    patches: &Patches,
    fragments: &[Tree],
) -> Result<NodeId> {
    let module = promote_members(tree, source)?;
    if let Some(name) = tree.full_name(module) {
        patches.apply(&name, tree, module);
    }

    for fragment in fragments {
        for class in top_level_classes(fragment) {
            let copy = tree.graft(fragment, class);
            match local_class(tree, module, copy) {
                Some(existing) => merge_class(tree, existing, copy),
                None => tree.append(module, copy),
            }
        }
    }

    let classes: Vec<NodeId> = tree
        .descendants(module)
        .into_iter()
        .filter(|id| matches!(tree.node(*id), Node::Class(_)))
        .collect();
    for class in classes {
        if let Some(name) = tree.full_name(class) {
            patches.apply(&name, tree, class);
        }
    }
    Ok(module)
}

/// The module's own class with the same name as the detached `class`.
fn local_class(tree: &Tree, module: NodeId, class: NodeId) -> Option<NodeId> {
    let name = tree.name(class)?;
    let module_name = tree.name(module)?;
    tree.find(module, &format!("{module_name}.{name}"))
        .filter(|id| matches!(tree.node(*id), Node::Class(_)))
}

/// Fold a class fragment into the declaration already in the module.
///
/// Members the target lacks are appended in fragment order. The fragment's
/// docstring and bases fill in only what the target is missing.
fn merge_class(tree: &mut Tree, target: NodeId, fragment: NodeId) {
    let known: HashSet<String> = tree
        .members(target)
        .iter()
        .filter_map(|m| tree.name(*m).map(str::to_string))
        .collect();

    if let Node::Class(incoming) = tree.node(fragment) {
        let bases = incoming.base_types().to_vec();
        if let Node::Class(class) = tree.node_mut(target) {
            if class.base_types().is_empty() {
                class.set_base_types(bases);
            }
        }
    }

    let mut added = 0;
    for child in tree.children(fragment).to_vec() {
        let node = tree.node(child);
        if matches!(node, Node::DocString) {
            if tree.docstring(target).is_none() {
                tree.detach(child);
                tree.insert(target, 0, child);
            }
            continue;
        }
        if node.is_member() && node.name().is_some_and(|n| known.contains(n)) {
            continue;
        }
        tree.detach(child);
        tree.append(target, child);
        added += 1;
    }
    debug!(
        "merged {added} members into {}",
        tree.full_name(target).unwrap_or_default()
    );
}

fn top_level_classes(tree: &Tree) -> Vec<NodeId> {
    tree.descendants(tree.root())
        .into_iter()
        .filter(|id| matches!(tree.node(*id), Node::Class(_)))
        .filter(|id| {
            !tree
                .ancestors(*id)
                .any(|a| matches!(tree.node(a), Node::Class(_)))
        })
        .collect()
}

fn write_stub(target: &Path, content: &str) -> Result<()> {
    let Some(dir) = target.parent() else {
        return Err(Error::io(
            target,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "no parent directory"),
        ));
    };
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    let marker = dir.join("py.typed");
    fs::write(&marker, "").map_err(|e| Error::io(&marker, e))?;
    fs::write(target, content).map_err(|e| Error::io(target, e))
}

/// Convert a whole directory of sources.
pub fn generate(config: &GenerateConfig) -> Result<Summary> {
    let patches = match &config.patches {
        Some(dir) => Patches::load(dir)?,
        None => Patches::empty(),
    };
    let renderer = create_renderer(&config.format)?;
    let root = Task::discover(config, &patches)?;
    fs::create_dir_all(&config.output).map_err(|e| Error::io(&config.output, e))?;

    let ctx = Context {
        output: &config.output,
        patches: &patches,
        renderer: renderer.as_ref(),
        total: root.total(),
        successful: AtomicUsize::new(0),
        failed: AtomicUsize::new(0),
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs)
        .build()?;
    pool.install(|| root.run(&ctx));

    let summary = Summary {
        successful: ctx.successful.load(Ordering::Relaxed),
        failed: ctx.failed.load(Ordering::Relaxed),
    };
    info!(
        "generated {} units, {} failed",
        summary.successful, summary.failed
    );
    Ok(summary)
}

/// Convert a single module document held in memory.
pub fn convert(text: &str, source: &str, patches: &Patches, renderer: &dyn Renderer) -> Result<String> {
    let mut tree = parse_document(text);
    let module = build_module(&mut tree, source, patches, &[])?;
    assemble(&mut tree, module, &[]);
    Ok(renderer.render(&tree, source))
}
