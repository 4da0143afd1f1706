//! Class declaration extraction from PHP sources using tree-sitter.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tree_sitter::{Node, Parser, Tree};

use crate::error::{ClassLoaderError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Class,
    Interface,
    Trait,
    Enum,
}

impl DeclarationKind {
    fn from_node_kind(kind: &str) -> Option<Self> {
        match kind {
            "class_declaration" => Some(Self::Class),
            "interface_declaration" => Some(Self::Interface),
            "trait_declaration" => Some(Self::Trait),
            "enum_declaration" => Some(Self::Enum),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclarationKind,
}

/// Returns the fully-qualified names declared by a PHP file, in source order.
///
/// Takes raw bytes: PHP sources are not required to be UTF-8, and legacy
/// code is often Latin-1. Declarations nested inside functions and methods
/// are skipped: they only exist once that code runs, not when the file is
/// loaded.
pub fn parse_declarations(source: &[u8]) -> Result<Vec<Declaration>> {
    if source.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_php::LANGUAGE_PHP.into())
        .map_err(|e| ClassLoaderError::Grammar {
            message: e.to_string(),
        })?;
    let tree = parse_tree(&mut parser, source)?;

    let mut namespace = String::new();
    let mut declarations = Vec::new();
    collect(tree.root_node(), source, &mut namespace, &mut declarations);
    Ok(declarations)
}

fn parse_tree(parser: &mut Parser, source: &[u8]) -> Result<Tree> {
    parser
        .parse(source, None)
        .ok_or_else(|| ClassLoaderError::Grammar {
            message: "parser produced no syntax tree".to_string(),
        })
}

fn collect(node: Node, bytes: &[u8], namespace: &mut String, out: &mut Vec<Declaration>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "namespace_definition" => {
                let name = namespace_name(&child, bytes);
                match namespace_body(&child) {
                    Some(body) => {
                        let mut scoped = name;
                        collect(body, bytes, &mut scoped, out);
                    }
                    None => *namespace = name,
                }
            }
            "function_definition" | "method_declaration" | "anonymous_function"
            | "arrow_function" | "anonymous_class" => {}
            kind => match DeclarationKind::from_node_kind(kind) {
                Some(decl_kind) => {
                    if let Some(name) = declared_name(&child, bytes) {
                        out.push(Declaration {
                            name: qualify(namespace, &name),
                            kind: decl_kind,
                        });
                    }
                }
                None => collect(child, bytes, namespace, out),
            },
        }
    }
}

fn namespace_name(node: &Node, bytes: &[u8]) -> String {
    let name = node.child_by_field_name("name").or_else(|| {
        let mut cursor = node.walk();
        let found = node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "namespace_name");
        found
    });
    name.map(|n| node_text(&n, bytes).trim_start_matches('\\').to_string())
        .unwrap_or_default()
}

fn namespace_body<'tree>(node: &Node<'tree>) -> Option<Node<'tree>> {
    node.child_by_field_name("body").or_else(|| {
        let mut cursor = node.walk();
        let found = node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "compound_statement");
        found
    })
}

fn declared_name(node: &Node, bytes: &[u8]) -> Option<String> {
    let name = node_text(&node.child_by_field_name("name")?, bytes);
    (!name.is_empty()).then_some(name)
}

/// Identifiers may carry non-ASCII bytes in non-UTF-8 files; those are
/// replaced rather than dropping the declaration.
fn node_text(node: &Node, bytes: &[u8]) -> String {
    match node.utf8_text(bytes) {
        Ok(text) => text.trim().to_string(),
        Err(_) => String::from_utf8_lossy(&bytes[node.byte_range()])
            .trim()
            .to_string(),
    }
}

fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}\\{name}")
    }
}

pub fn hash_content(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(source: &str) -> Vec<String> {
        parse_declarations(source.as_bytes())
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect()
    }

    #[test]
    fn statement_namespace_applies_to_following_declarations() {
        let src = r#"<?php
namespace Serenity\Common;

interface Loader {}

final class ClassLoader implements Loader
{
    public function loadClass($className) {}
}
"#;
        let decls = parse_declarations(src.as_bytes()).unwrap();
        assert_eq!(
            decls,
            vec![
                Declaration {
                    name: "Serenity\\Common\\Loader".to_string(),
                    kind: DeclarationKind::Interface,
                },
                Declaration {
                    name: "Serenity\\Common\\ClassLoader".to_string(),
                    kind: DeclarationKind::Class,
                },
            ]
        );
    }

    #[test]
    fn braced_namespaces_scope_their_bodies() {
        let src = r#"<?php
namespace App\Models {
    class User {}
}
namespace {
    trait Greets {}
}
"#;
        assert_eq!(names(src), vec!["App\\Models\\User", "Greets"]);
    }

    #[test]
    fn global_legacy_class_has_no_namespace() {
        let src = "<?php\nclass Zend_Db_Table extends Zend_Db_Table_Abstract {}\n";
        assert_eq!(names(src), vec!["Zend_Db_Table"]);
    }

    #[test]
    fn conditional_declarations_count_but_function_bodies_do_not() {
        let src = r#"<?php
if (!class_exists('Polyfill')) {
    class Polyfill {}
}
function make() {
    class Hidden {}
    return new class {};
}
enum Suit { case Hearts; }
"#;
        assert_eq!(names(src), vec!["Polyfill", "Suit"]);
    }

    #[test]
    fn empty_source_declares_nothing() {
        assert!(names("   \n").is_empty());
        assert!(names("<?php\necho 'hi';\n").is_empty());
    }

    #[test]
    fn hash_content_is_sha256_hex() {
        assert_eq!(
            hash_content(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn latin1_sources_still_declare_their_classes() {
        let mut src = b"<?php\nclass Legacy_Caf { const NAME = 'caf".to_vec();
        src.push(0xE9);
        src.extend_from_slice(b"'; }\n");
        assert!(std::str::from_utf8(&src).is_err());

        let decls = parse_declarations(&src).unwrap();
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0].name, "Legacy_Caf");
    }

    #[test]
    fn parser_without_grammar_reports_an_error() {
        let mut parser = Parser::new();
        let err = parse_tree(&mut parser, b"<?php class A {}").unwrap_err();
        assert!(matches!(err, ClassLoaderError::Grammar { .. }));
    }
}
