// Copyright 2026 the Graft Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! HTML-like snapshots of host trees and descriptions.
//!
//! Elements render as `<tag a="1" b="x">…</tag>` with attributes sorted by
//! name, text renders escaped, and containers render only their children.
//! [`describe`] renders a description as the host tree it should produce:
//! composite and fragment nodes contribute only their children and
//! placeholders contribute nothing.

use graft_core::describe::Node;
use graft_core::host::HostHandle;
use graft_core::unit::{Attributes, UnitKind};

use crate::host::{MemKind, MemoryHost};

/// Renders the host nodes a description should produce.
#[must_use]
pub fn describe(node: &Node) -> String {
    let mut out = String::new();
    write_description(node, &mut out);
    out
}

fn write_description(node: &Node, out: &mut String) {
    match node.kind() {
        UnitKind::Element(tag) => {
            open_tag(tag, node.attributes(), out);
            for child in node.children_ref() {
                write_description(child, out);
            }
            close_tag(tag, out);
        }
        UnitKind::Text => escape_into(node.text_value().unwrap_or_default(), out),
        UnitKind::Composite(_) | UnitKind::Fragment => {
            for child in node.children_ref() {
                write_description(child, out);
            }
        }
        UnitKind::Placeholder => {}
    }
}

pub(crate) fn write_host(host: &MemoryHost, handle: HostHandle, out: &mut String) {
    let Some(node) = host.node(handle) else {
        out.push_str("<?>");
        return;
    };
    match node.kind() {
        MemKind::Element(tag) => {
            open_tag(tag, node.attributes(), out);
            for &child in node.children() {
                write_host(host, child, out);
            }
            close_tag(tag, out);
        }
        MemKind::Text(text) => escape_into(text, out),
        MemKind::Container => {
            for &child in node.children() {
                write_host(host, child, out);
            }
        }
    }
}

fn open_tag(tag: &str, attributes: &Attributes, out: &mut String) {
    out.push('<');
    out.push_str(tag);
    let mut sorted: Vec<_> = attributes.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    for (name, value) in sorted {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_into(&value.to_string(), out);
        out.push('"');
    }
    out.push('>');
}

fn close_tag(tag: &str, out: &mut String) {
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn escape_into(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_host_kinds_flatten() {
        let tree = Node::element("div")
            .attr("z", 1_i64)
            .attr("a", "x<y")
            .child(Node::composite("Greeting").child(Node::text("hi & bye")))
            .child(Node::fragment().child(Node::element("br")))
            .child(Node::placeholder())
            .build();
        assert_eq!(
            describe(&tree),
            r#"<div a="x&lt;y" z="1">hi &amp; bye<br></br></div>"#
        );
    }
}
