//! Module assembly: promote members, compute imports, order classes and
//! localise type names.
//!
//! The passes run on a parsed document in this order:
//!
//! 1. [`promote_members`] moves every member declared outside a class under
//!    the module and leaves a reference paragraph where it was declared.
//! 2. [`import_types`] replaces the module's imports with one `import root`
//!    per external package the members refer to.
//! 3. [`sort_members`] orders the module's classes so bases come first.
//! 4. [`add_submodule_imports`] adds `from . import sub` lines.
//! 5. [`localise_types`] strips the module's own prefix from type slots.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use rststub_syntax::is_builtin;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{localise, Import, Node, NodeId, Tree, RE_DOTTED};

/// Detach the first module from the document and hang it back under the
/// root with every member and the remaining narrative inside it.
///
/// Returns the module id. A document without a `.. module::` directive is
/// an error for the unit.
pub fn promote_members(tree: &mut Tree, source: &str) -> Result<NodeId> {
    let root = tree.root();
    let module = tree
        .descendants(root)
        .into_iter()
        .find(|id| matches!(tree.node(*id), Node::Module(_)))
        .ok_or_else(|| Error::MissingModule(source.to_string()))?;
    tree.detach(module);

    let members: Vec<NodeId> = tree
        .descendants(root)
        .into_iter()
        .filter(|id| tree.node(*id).is_member())
        .filter(|id| {
            !tree
                .ancestors(*id)
                .any(|a| matches!(tree.node(a), Node::Class(_)))
        })
        .collect();

    for member in members {
        let paragraph = tree.create(Node::Paragraph);
        tree.replace(member, paragraph);
        tree.append(module, member);
        match tree.create_ref(member) {
            Some(reference) => {
                tree.append_new(paragraph, Node::Reference(reference));
            }
            None => tree.detach(paragraph),
        }
    }

    let narrative = tree.children(root).to_vec();
    if !narrative.is_empty() {
        let docstring = tree.create(Node::DocString);
        for child in narrative {
            tree.append(docstring, child);
        }
        tree.insert(module, 0, docstring);
    }
    tree.append(root, module);

    debug!(
        "{source}: promoted {} members",
        tree.members(module).len()
    );
    Ok(module)
}

/// Replace the module's imports with the packages its members refer to.
pub fn import_types(tree: &mut Tree, module: NodeId) {
    let module_name = tree.name(module).unwrap_or_default().to_string();
    let local: HashSet<String> = local_classes(tree, module).into_keys().collect();

    let mut roots = BTreeSet::from(["typing".to_string()]);
    for expr in tree.referred_types(module) {
        let expr = strip_markup(&expr);
        for token in RE_DOTTED.find_iter(&expr).map(|m| m.as_str()) {
            let Some((root, _)) = token.split_once('.') else {
                continue;
            };
            if is_builtin(token)
                || local.contains(root)
                || token == module_name
                || token.starts_with(&format!("{module_name}."))
            {
                continue;
            }
            roots.insert(root.to_string());
        }
    }

    for import in tree.imports(module) {
        tree.detach(import);
    }
    let mut index = usize::from(tree.docstring(module).is_some());
    for root in roots {
        let import = tree.create(Node::Import(Import::module(&root)));
        tree.insert(module, index, import);
        index += 1;
    }
}

/// Add one `from . import <name>` per child module, after the plain imports.
pub fn add_submodule_imports(tree: &mut Tree, module: NodeId, submodules: &[String]) {
    let mut index = match tree.imports(module).last() {
        Some(last) => tree.index_of(module, *last).map_or(0, |i| i + 1),
        None => usize::from(tree.docstring(module).is_some()),
    };
    for submodule in submodules {
        let name = tree.localise_name(module, submodule);
        let import = tree.create(Node::Import(Import::from_module(".", &[name.as_str()])));
        tree.insert(module, index, import);
        index += 1;
    }
}

/// Order the module's classes so that every class follows the classes it
/// depends on.
///
/// Base classes are hard dependencies. Local types used anywhere in a
/// class's members are soft ones, dropped when they would form a cycle.
/// Ties keep declaration order: the queue is seeded in declaration order
/// and a class that becomes ready joins the back of it.
pub fn sort_members(tree: &mut Tree, module: NodeId) {
    let classes = tree.classes(module);
    if classes.is_empty() {
        return;
    }
    let module_name = tree.name(module).unwrap_or_default().to_string();
    let local = local_classes(tree, module);

    let mut hard: Vec<HashSet<usize>> = Vec::with_capacity(classes.len());
    let mut deps: Vec<HashSet<usize>> = Vec::with_capacity(classes.len());
    for (i, class) in classes.iter().enumerate() {
        let Node::Class(record) = tree.node(*class) else {
            unreachable!("classes() only yields classes");
        };
        let bases: HashSet<usize> = record
            .base_types()
            .iter()
            .filter_map(|b| local.get(&localise(&module_name, b)).copied())
            .filter(|j| *j != i)
            .collect();

        let mut all = bases.clone();
        for expr in tree.referred_types(*class) {
            let expr = localise(&module_name, &strip_markup(&expr));
            all.extend(
                RE_DOTTED
                    .find_iter(&expr)
                    .filter_map(|m| local.get(m.as_str()).copied())
                    .filter(|j| *j != i),
            );
        }
        hard.push(bases);
        deps.push(all);
    }

    let order = kahn(&hard, &deps);

    let Some(position) = tree.index_of(module, classes[0]) else {
        return;
    };
    for class in &classes {
        tree.detach(*class);
    }
    for (offset, i) in order.into_iter().enumerate() {
        tree.insert(module, position + offset, classes[i]);
    }
}

/// Topological order over indices `0..deps.len()`.
fn kahn(hard: &[HashSet<usize>], deps: &[HashSet<usize>]) -> Vec<usize> {
    let count = deps.len();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut pending: Vec<usize> = vec![0; count];
    for (i, set) in deps.iter().enumerate() {
        pending[i] = set.len();
        let mut sorted: Vec<usize> = set.iter().copied().collect();
        sorted.sort_unstable();
        for j in sorted {
            dependents[j].push(i);
        }
    }

    let mut queue: VecDeque<usize> = (0..count).filter(|i| pending[*i] == 0).collect();
    let mut emitted = vec![false; count];
    let mut order = Vec::with_capacity(count);

    while order.len() < count {
        let next = match queue.pop_front() {
            Some(next) => next,
            None => {
                // A cycle: take the first class whose bases are all out.
                let remaining: Vec<usize> = (0..count).filter(|i| !emitted[*i]).collect();
                match remaining
                    .iter()
                    .find(|i| hard[**i].iter().all(|j| emitted[*j]))
                    .or(remaining.first())
                {
                    Some(next) => *next,
                    None => break,
                }
            }
        };
        if emitted[next] {
            continue;
        }
        emitted[next] = true;
        order.push(next);
        for dependent in &dependents[next] {
            pending[*dependent] = pending[*dependent].saturating_sub(1);
            if pending[*dependent] == 0 && !emitted[*dependent] {
                queue.push_back(*dependent);
            }
        }
    }
    order
}

/// Rewrite type slots and base lists below `module` to in-module names.
pub fn localise_types(tree: &mut Tree, module: NodeId) {
    let Some(module_name) = tree.name(module).map(str::to_string) else {
        return;
    };
    for id in tree.descendants(module) {
        match tree.node_mut(id) {
            Node::Class(class) => {
                let bases: Vec<String> = class
                    .base_types()
                    .iter()
                    .map(|b| localise(&module_name, b))
                    .collect();
                class.set_base_types(bases);
            }
            node => {
                if let Some(typed) = node.as_typed_mut() {
                    if let Some(local) = typed.type_info().map(|t| localise(&module_name, t)) {
                        typed.set_type(Some(local));
                    }
                }
            }
        }
    }
}

/// Run the import, sort and localisation passes on a promoted module.
pub fn assemble(tree: &mut Tree, module: NodeId, submodules: &[String]) {
    import_types(tree, module);
    sort_members(tree, module);
    add_submodule_imports(tree, module, submodules);
    localise_types(tree, module);
}

/// Bare names of the module's classes mapped to their position.
fn local_classes(tree: &Tree, module: NodeId) -> HashMap<String, usize> {
    tree.classes(module)
        .into_iter()
        .enumerate()
        .filter_map(|(i, c)| tree.name(c).map(|name| (name.to_string(), i)))
        .collect()
}

/// Drop role markup left in a type written by hand, e.g. in a patch.
fn strip_markup(expr: &str) -> String {
    let expr = expr.replace('"', "");
    let expr = match expr.strip_prefix(':').and_then(|e| e.split_once(':')) {
        Some((_, rest)) => rest.to_string(),
        None => expr,
    };
    expr.replace(['`', '!', '~'], "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Class, Data, Function, Module, Scope, Typed};
    use crate::parser::parse_document;

    fn module_with(name: &str) -> (Tree, NodeId) {
        let mut tree = Tree::new();
        let root = tree.root();
        let module = tree.append_new(root, Node::Module(Module::new(name)));
        (tree, module)
    }

    fn add_class(tree: &mut Tree, module: NodeId, name: &str, bases: &[&str]) -> NodeId {
        let mut class = Class::new(name);
        class.set_base_types(bases.iter().copied());
        tree.append_new(module, Node::Class(class))
    }

    fn member_names(tree: &Tree, module: NodeId) -> Vec<String> {
        tree.members(module)
            .iter()
            .filter_map(|m| tree.name(*m).map(str::to_string))
            .collect()
    }

    fn import_texts(tree: &Tree, module: NodeId) -> Vec<String> {
        tree.imports(module)
            .iter()
            .map(|i| match tree.node(*i) {
                Node::Import(import) => import.text(),
                _ => unreachable!(),
            })
            .collect()
    }

    const LOGIC: &str = "\
Game Logic (bge.logic)
======================

.. module:: bge.logic

Module to access logic functions.

.. data:: mouse

   The current mouse wrapped in an :class:`~bge.types.SCA_PythonMouse` object.

   :type: :class:`bge.types.SCA_PythonMouse`

.. class:: Helper

   .. method:: run()
";

    #[test]
    fn promotion_moves_members_and_leaves_references() {
        let mut tree = parse_document(LOGIC);
        let module = promote_members(&mut tree, "bge.logic.rst").unwrap();

        let root = tree.root();
        assert_eq!(tree.children(root), [module]);

        let kinds: Vec<&str> = tree
            .children(module)
            .iter()
            .map(|c| tree.node(*c).kind())
            .collect();
        assert_eq!(kinds, ["docstring", "data", "class"]);
        assert_eq!(member_names(&tree, module), ["mouse", "Helper"]);

        let docstring = tree.docstring(module).unwrap();
        assert_eq!(
            tree.text(docstring),
            "Game Logic (bge.logic)\n======================\n\n\
             Module to access logic functions.\n\n\
             :data:`bge.logic.mouse`\n\n\
             :class:`bge.logic.Helper`"
        );

        // Nested methods stay inside their class.
        let helper = tree.classes(module)[0];
        assert_eq!(member_names(&tree, helper), ["run"]);
        assert_eq!(tree.full_name(tree.members(helper)[0]).as_deref(), Some("bge.logic.Helper.run"));
    }

    #[test]
    fn promotion_requires_a_module() {
        let mut tree = parse_document(".. data:: x\n");
        let err = promote_members(&mut tree, "orphan.rst").unwrap_err();
        assert!(matches!(err, Error::MissingModule(ref s) if s == "orphan.rst"));
    }

    #[test]
    fn imports_follow_docstring() {
        let mut tree = parse_document(LOGIC);
        let module = promote_members(&mut tree, "bge.logic.rst").unwrap();
        import_types(&mut tree, module);

        assert_eq!(import_texts(&tree, module), ["import bge", "import typing"]);
        let kinds: Vec<&str> = tree
            .children(module)
            .iter()
            .map(|c| tree.node(*c).kind())
            .collect();
        assert_eq!(kinds, ["docstring", "import", "import", "data", "class"]);
    }

    #[test]
    fn imports_skip_local_and_self_references() {
        let (mut tree, module) = module_with("mymodule");
        let mut external = Data::new("external");
        external.set_type(Some("typing.List[foo.Bar]".into()));
        tree.append_new(module, Node::Data(external));

        let mut own = Data::new("own");
        own.set_type(Some("mymodule.Other".into()));
        tree.append_new(module, Node::Data(own));

        let local = add_class(&mut tree, module, "Local", &[]);
        let mut method = Function::new("clone", Scope::Instance);
        method.set_type(Some("Local".into()));
        tree.append_new(local, Node::Function(method));

        let mut builtin = Data::new("count");
        builtin.set_type(Some("int".into()));
        tree.append_new(module, Node::Data(builtin));

        // Stale imports are discarded.
        let stale = tree_import(&mut tree, "stale");
        tree.insert(module, 0, stale);

        import_types(&mut tree, module);
        assert_eq!(import_texts(&tree, module), ["import foo", "import typing"]);
        assert_eq!(tree.node(tree.children(module)[0]).kind(), "import");
    }

    fn tree_import(tree: &mut Tree, module: &str) -> NodeId {
        tree.create(Node::Import(Import::module(module)))
    }

    #[test]
    fn sort_is_stable_topological() {
        let (mut tree, module) = module_with("mymodule");
        add_class(&mut tree, module, "TypeA", &["TypeC", "TypeB"]);
        add_class(&mut tree, module, "TypeB", &["bpy.types.Object"]);
        add_class(&mut tree, module, "TypeC", &["TypeB"]);
        add_class(&mut tree, module, "TypeD", &["TypeA"]);
        add_class(&mut tree, module, "TypeE", &[]);

        sort_members(&mut tree, module);
        assert_eq!(
            member_names(&tree, module),
            ["TypeB", "TypeE", "TypeC", "TypeA", "TypeD"]
        );
    }

    #[test]
    fn sort_chain() {
        let (mut tree, module) = module_with("m");
        add_class(&mut tree, module, "A", &["B"]);
        add_class(&mut tree, module, "B", &["m.C"]);
        add_class(&mut tree, module, "C", &[]);
        sort_members(&mut tree, module);
        assert_eq!(member_names(&tree, module), ["C", "B", "A"]);
    }

    #[test]
    fn sort_keeps_block_position() {
        let (mut tree, module) = module_with("m");
        tree.append_new(module, Node::Data(Data::new("first")));
        add_class(&mut tree, module, "Child", &["Parent"]);
        add_class(&mut tree, module, "Parent", &[]);
        sort_members(&mut tree, module);
        assert_eq!(member_names(&tree, module), ["first", "Parent", "Child"]);
    }

    #[test]
    fn member_references_order_classes_unless_cyclic() {
        let (mut tree, module) = module_with("m");
        let scene = add_class(&mut tree, module, "Scene", &[]);
        let mut objects = Data::new("objects");
        objects.set_type(Some("typing.List[m.Object]".into()));
        tree.append_new(scene, Node::Data(objects));

        let object = add_class(&mut tree, module, "Object", &[]);
        let mut owner = Data::new("scene");
        owner.set_type(Some("m.Scene".into()));
        tree.append_new(object, Node::Data(owner));

        add_class(&mut tree, module, "Mesh", &["Object"]);

        // Scene and Object refer to each other; declaration order decides.
        sort_members(&mut tree, module);
        assert_eq!(member_names(&tree, module), ["Scene", "Object", "Mesh"]);
    }

    #[test]
    fn sort_without_classes_is_a_no_op() {
        let (mut tree, module) = module_with("m");
        tree.append_new(module, Node::Data(Data::new("x")));
        sort_members(&mut tree, module);
        assert_eq!(member_names(&tree, module), ["x"]);
    }

    #[test]
    fn submodule_imports_after_plain_imports() {
        let mut tree = parse_document(LOGIC);
        let module = promote_members(&mut tree, "bge.logic.rst").unwrap();
        import_types(&mut tree, module);
        add_submodule_imports(&mut tree, module, &["bge.logic.sub".to_string()]);
        assert_eq!(
            import_texts(&tree, module),
            ["import bge", "import typing", "from . import sub"]
        );
    }

    #[test]
    fn localisation_rewrites_type_slots() {
        let (mut tree, module) = module_with("bge.types");
        let mut data = Data::new("objects");
        data.set_type(Some("typing.List[bge.types.KX_GameObject]".into()));
        let data = tree.append_new(module, Node::Data(data));
        let class = add_class(&mut tree, module, "KX_GameObject", &["bge.types.SCA_IObject"]);

        localise_types(&mut tree, module);
        assert_eq!(
            tree.node(data).type_info(),
            Some("typing.List[KX_GameObject]")
        );
        match tree.node(class) {
            Node::Class(c) => assert_eq!(c.base_types(), ["SCA_IObject"]),
            _ => unreachable!(),
        }
    }

    #[test]
    fn strip_markup_variants() {
        assert_eq!(strip_markup(":class:`~bge.types.Foo`"), "bge.types.Foo");
        assert_eq!(strip_markup("\"bpy.types.Object\""), "bpy.types.Object");
        assert_eq!(strip_markup("typing.List[int]"), "typing.List[int]");
    }
}
