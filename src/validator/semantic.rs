//! Syntax-tree analysis using tree-sitter.
//!
//! Parses the candidate with the Python grammar and collects security
//! findings in a single cursor traversal: deny-listed call targets (including
//! dotted paths), deny-listed attribute accesses, imported module roots, a
//! star-import flag, the total node count, and the maximum nesting depth.

use crate::verdict::{RejectReason, Rejection};
use std::collections::HashSet;
use std::sync::LazyLock;
use tree_sitter::{Node, Parser, Tree};

/// Bare call names considered unsafe
static DANGEROUS_CALLS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        // dynamic code execution
        "eval",
        "exec",
        "compile",
        "__import__",
        // reflection primitives
        "getattr",
        "setattr",
        "delattr",
        "globals",
        "locals",
        "vars",
        // filesystem / console
        "open",
        "input",
        "breakpoint",
    ])
});

/// Dotted call paths considered unsafe
static DANGEROUS_DOTTED_CALLS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        // process execution
        "os.system",
        "os.popen",
        "os.execv",
        "os.execve",
        "os.execvp",
        "os.spawnl",
        "os.spawnv",
        "os.fork",
        "os.kill",
        "subprocess.run",
        "subprocess.call",
        "subprocess.check_call",
        "subprocess.check_output",
        "subprocess.Popen",
        // filesystem
        "os.remove",
        "os.unlink",
        "os.rmdir",
        "os.removedirs",
        "os.rename",
        "os.chmod",
        "os.chown",
        "shutil.rmtree",
        "shutil.move",
        // networking
        "socket.socket",
        "socket.create_connection",
        "urllib.request.urlopen",
        // deserialization
        "pickle.load",
        "pickle.loads",
        "marshal.load",
        "marshal.loads",
        "yaml.load",
        "yaml.unsafe_load",
        // concurrency spawners
        "threading.Thread",
        "multiprocessing.Process",
        "multiprocessing.Pool",
        // native memory
        "ctypes.CDLL",
        "ctypes.cdll.LoadLibrary",
        "mmap.mmap",
        // import machinery
        "importlib.import_module",
    ])
});

/// Reflective attribute names considered unsafe to touch
static DANGEROUS_ATTRIBUTES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "__globals__",
        "__builtins__",
        "__subclasses__",
        "__bases__",
        "__mro__",
        "__class__",
        "__dict__",
        "__code__",
        "__closure__",
        "__getattribute__",
        "__reduce__",
        "__reduce_ex__",
        "__loader__",
        "__spec__",
        "func_globals",
        "f_globals",
        "f_builtins",
        "gi_frame",
    ])
});

/// Module roots considered unsafe to import
static DANGEROUS_IMPORTS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    HashSet::from([
        "os",
        "sys",
        "subprocess",
        "shutil",
        "socket",
        "ctypes",
        "mmap",
        "pickle",
        "marshal",
        "shelve",
        "importlib",
        "builtins",
        "threading",
        "multiprocessing",
        "signal",
        "pty",
        "fcntl",
        "resource",
        "gc",
        "inspect",
        "code",
        "codeop",
    ])
});

/// Node kinds that introduce a new nesting level
const NESTING_KINDS: &[&str] = &[
    "function_definition",
    "class_definition",
    "if_statement",
    "for_statement",
    "while_statement",
    "try_statement",
    "with_statement",
    "match_statement",
];

/// Read-only snapshot of one traversal over the parsed candidate.
/// Owned by a single validation call; nothing here is shared.
#[derive(Debug, Clone, Default)]
pub struct SecurityFindings {
    pub dangerous_calls: Vec<String>,
    pub dangerous_attributes: Vec<String>,
    pub dangerous_imports: Vec<String>,
    pub has_star_import: bool,
    pub node_count: usize,
    pub max_depth: usize,
}

/// Parse the candidate with the Python grammar.
///
/// A fresh parser is built per call so concurrent validations never share
/// mutable state.
pub fn parse(code: &str) -> Result<Tree, Rejection> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| {
            Rejection::new(
                RejectReason::ParseError,
                format!("failed to load grammar: {}", e),
            )
        })?;

    let tree = parser.parse(code, None).ok_or_else(|| {
        Rejection::new(RejectReason::ParseError, "parser returned no tree")
    })?;

    if tree.root_node().has_error() {
        let (line, column) = first_error_position(&tree);
        return Err(Rejection::new(
            RejectReason::SyntaxError,
            format!("syntax error at line {}, column {}", line, column),
        ));
    }

    Ok(tree)
}

/// Locate the first ERROR or MISSING node for the diagnostic (1-indexed line)
fn first_error_position(tree: &Tree) -> (usize, usize) {
    fn find(node: Node) -> Option<(usize, usize)> {
        if node.is_error() || node.is_missing() {
            let pos = node.start_position();
            return Some((pos.row + 1, pos.column));
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.has_error() {
                if let Some(found) = find(child) {
                    return Some(found);
                }
            }
        }
        None
    }

    find(tree.root_node()).unwrap_or((1, 0))
}

/// Single-pass traversal producing the findings snapshot
pub fn analyze(tree: &Tree, source: &str) -> SecurityFindings {
    let mut findings = SecurityFindings::default();
    walk(tree.root_node(), source, 0, &mut findings);
    findings
}

fn walk(node: Node, source: &str, depth: usize, findings: &mut SecurityFindings) {
    findings.node_count += 1;

    let next_depth = if NESTING_KINDS.contains(&node.kind()) {
        let d = depth + 1;
        if d > findings.max_depth {
            findings.max_depth = d;
        }
        d
    } else {
        depth
    };

    match node.kind() {
        "call" => {
            if let Some(function) = node.child_by_field_name("function") {
                inspect_call_target(function, source, findings);
            }
        }
        "attribute" => {
            if let Some(attr) = node.child_by_field_name("attribute") {
                let name = node_text(attr, source);
                if DANGEROUS_ATTRIBUTES.contains(name) {
                    findings.dangerous_attributes.push(name.to_string());
                }
            }
        }
        "import_statement" | "import_from_statement" => {
            inspect_import(node, source, findings);
        }
        _ => {}
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, source, next_depth, findings);
    }
}

/// Record the call target if it is deny-listed, by bare name or dotted path
fn inspect_call_target(function: Node, source: &str, findings: &mut SecurityFindings) {
    match function.kind() {
        "identifier" => {
            let name = node_text(function, source);
            if DANGEROUS_CALLS.contains(name) {
                findings.dangerous_calls.push(name.to_string());
            }
        }
        "attribute" => {
            if let Some(path) = dotted_path(function, source) {
                if DANGEROUS_DOTTED_CALLS.contains(path.as_str()) {
                    findings.dangerous_calls.push(path);
                }
            }
        }
        _ => {}
    }
}

/// Rebuild a dotted path like `os.system` from nested attribute nodes.
/// Paths rooted in something other than plain identifiers are skipped.
fn dotted_path(node: Node, source: &str) -> Option<String> {
    match node.kind() {
        "identifier" => Some(node_text(node, source).to_string()),
        "attribute" => {
            let object = node.child_by_field_name("object")?;
            let attr = node.child_by_field_name("attribute")?;
            let base = dotted_path(object, source)?;
            Some(format!("{}.{}", base, node_text(attr, source)))
        }
        _ => None,
    }
}

/// Record deny-listed import roots and the star-import flag
fn inspect_import(node: Node, source: &str, findings: &mut SecurityFindings) {
    let mut cursor = node.walk();
    // in a from-import only the first dotted_name is the module position;
    // later ones are imported names
    let mut saw_module = false;
    for child in node.children(&mut cursor) {
        match child.kind() {
            "dotted_name" => {
                if node.kind() == "import_from_statement" && saw_module {
                    continue;
                }
                saw_module = true;
                let root = node_text(child, source)
                    .split('.')
                    .next()
                    .unwrap_or_default()
                    .to_string();
                if DANGEROUS_IMPORTS.contains(root.as_str()) {
                    findings.dangerous_imports.push(root);
                }
            }
            "aliased_import" => {
                // aliased children of a from-import are imported names too
                if node.kind() == "import_from_statement" {
                    continue;
                }
                if let Some(name) = child.child_by_field_name("name") {
                    let root = node_text(name, source)
                        .split('.')
                        .next()
                        .unwrap_or_default()
                        .to_string();
                    if DANGEROUS_IMPORTS.contains(root.as_str()) {
                        findings.dangerous_imports.push(root);
                    }
                }
            }
            "wildcard_import" => {
                findings.has_star_import = true;
            }
            _ => {}
        }
    }
}

fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}
