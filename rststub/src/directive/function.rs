//! `.. function::`, `.. method::`, `.. classmethod::`, `.. staticmethod::`.
//!
//! Each line of the directive argument is an overload and becomes its own
//! function node sharing the same documented fields.

use std::collections::HashMap;

use rststub_syntax::{parse_signature, parse_type, split_overloads, Param, ANY};

use super::Builder;
use crate::diagnostics::Diagnostic;
use crate::model::{Argument, Function, Node, NodeId, Scope, Typed};
use crate::parser::rst::Directive;

pub(super) fn run(builder: &mut Builder, directive: &Directive, scope: Scope) -> Vec<NodeId> {
    let info = builder.parse_docstring(directive);
    let line = directive.line;
    let mut produced = Vec::new();

    let overloads = split_overloads(&directive.argument);
    if overloads.is_empty() {
        produced.push(builder.message(Diagnostic::error("Invalid function signature: ", line)));
    }

    let mut docstring_used = false;
    for overload in overloads {
        let signature = match parse_signature(&overload) {
            Ok(signature) => signature,
            Err(err) => {
                produced.push(builder.message(Diagnostic::error(
                    format!("Invalid function signature: {overload} ({err})"),
                    line,
                )));
                continue;
            }
        };

        let mut function = Function::new(&signature.name, scope);
        let mut messages = Vec::new();

        if let Some(text) = info.fields.get("rtype") {
            let return_type = parse_type(text).unwrap_or_else(|| {
                messages.push(Diagnostic::warning(
                    format!(
                        "Function {} has invalid return type: {text}",
                        signature.name
                    ),
                    line,
                ));
                ANY.to_string()
            });
            function.set_type(Some(return_type));
        }
        let returns = info
            .fields
            .get("return")
            .or_else(|| info.fields.get("returns"));
        function.set_returns(returns.cloned());

        let member = builder.tree.create(Node::Function(function));

        // Overloads after the first get their own copy of the docstring.
        let docstring = if docstring_used {
            builder.tree.deep_copy(info.docstring)
        } else {
            docstring_used = true;
            info.docstring
        };
        builder.attach_docstring(member, docstring);

        let skip: &[&str] = match scope {
            Scope::Class => &["self", "cls"],
            _ => &["self"],
        };
        let (arguments, argument_messages) =
            arguments(&signature.params, &info.fields, skip, line);
        for argument in arguments {
            builder.tree.append_new(member, Node::Argument(argument));
        }
        messages.extend(argument_messages);

        produced.push(member);
        for diagnostic in messages {
            produced.push(builder.message(diagnostic));
        }
    }

    produced.extend(info.remainder);
    produced
}

/// Argument records for `params`, typed from `:type <name>:` fields.
pub(super) fn arguments(
    params: &[Param],
    fields: &HashMap<String, String>,
    skip: &[&str],
    line: usize,
) -> (Vec<Argument>, Vec<Diagnostic>) {
    let mut arguments = Vec::with_capacity(params.len());
    let mut messages = Vec::new();

    for param in params {
        if skip.contains(&param.name.as_str()) {
            continue;
        }
        let mut argument = Argument::new(&param.name);

        let key = format!("type {}", param.name.trim_start_matches('*'));
        if let Some(text) = fields.get(&key) {
            let type_info = parse_type(text).unwrap_or_else(|| {
                messages.push(Diagnostic::warning(
                    format!("Invalid argument type: {text}"),
                    line,
                ));
                ANY.to_string()
            });
            argument.set_type(Some(type_info));
        }

        argument.set_default(param.default.clone());
        arguments.push(argument);
    }

    (arguments, messages)
}
