use std::collections::HashSet;

use crate::types::{Node, Sexpr};

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub symbol: String,
    pub value: Node,
}

impl Binding {
    pub fn new(symbol: impl Into<String>, value: Node) -> Binding {
        Binding {
            symbol: symbol.into(),
            value,
        }
    }
}

/// One growable sequence of bindings shared by every evaluation depth.
///
/// Lookup scans backwards and stops at the first match, so appending a
/// binding for an existing name shadows the older one instead of
/// overwriting it. Lambda applications push their parameter bindings as a
/// block and pop exactly that count afterwards; there is no nested frame
/// tree, recursive calls simply stack their frames here in LIFO order.
#[derive(Debug, Default)]
pub struct Environment {
    bindings: Vec<Binding>,
}

impl Environment {
    pub fn new() -> Environment {
        Environment::default()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Appends a binding to the current top of the sequence.
    pub fn define(&mut self, symbol: impl Into<String>, value: Node) {
        self.bindings.push(Binding::new(symbol, value));
    }

    /// Appends a lambda application's parameter bindings; returns the count
    /// the caller must later hand back to `pop_frame`.
    pub fn push_frame(&mut self, frame: Vec<Binding>) -> usize {
        let count = frame.len();
        self.bindings.extend(frame);
        count
    }

    /// Removes the `count` most recently pushed bindings. Callers must pop
    /// exactly what they pushed, on the error path too.
    pub fn pop_frame(&mut self, count: usize) {
        let len = self.bindings.len().saturating_sub(count);
        self.bindings.truncate(len);
    }

    /// Innermost binding for `symbol`, if any.
    pub fn lookup(&self, symbol: &str) -> Option<&Node> {
        self.bindings
            .iter()
            .rev()
            .find(|binding| binding.symbol == symbol)
            .map(|binding| &binding.value)
    }

    /// Backward scan with transitive aliasing: a binding whose value is
    /// itself a symbol redirects the search, which continues *below* the
    /// matched binding. An alias therefore only sees targets bound before
    /// it.
    pub fn resolve(&self, symbol: &str) -> Option<&Node> {
        let mut name = symbol;
        for binding in self.bindings.iter().rev() {
            if binding.symbol == name {
                match &binding.value.kind {
                    Sexpr::Symbol(next) => name = next,
                    _ => return Some(&binding.value),
                }
            }
        }
        None
    }

    /// All bound names, for REPL completion.
    pub fn identifiers(&self) -> HashSet<String> {
        self.bindings
            .iter()
            .map(|binding| binding.symbol.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Span;

    fn num_node(n: f64) -> Node {
        Node::new_number(n, Span::default())
    }

    fn sym_node(s: &str) -> Node {
        Node::new_symbol(s, Span::default())
    }

    #[test]
    fn test_define_and_lookup() {
        let mut env = Environment::new();
        env.define("x", num_node(10.0));

        assert_eq!(env.lookup("x"), Some(&num_node(10.0)));
        assert_eq!(env.lookup("y"), None);
    }

    #[test]
    fn test_redefine_shadows_instead_of_overwriting() {
        let mut env = Environment::new();
        env.define("x", num_node(10.0));
        env.define("x", num_node(50.0));

        assert_eq!(env.len(), 2);
        assert_eq!(env.lookup("x"), Some(&num_node(50.0)));
    }

    #[test]
    fn test_push_pop_frame() {
        let mut env = Environment::new();
        env.define("x", num_node(1.0));

        let count = env.push_frame(vec![
            Binding::new("x", num_node(2.0)),
            Binding::new("y", num_node(3.0)),
        ]);
        assert_eq!(count, 2);
        assert_eq!(env.lookup("x"), Some(&num_node(2.0)));
        assert_eq!(env.lookup("y"), Some(&num_node(3.0)));

        env.pop_frame(count);
        assert_eq!(env.lookup("x"), Some(&num_node(1.0)));
        assert_eq!(env.lookup("y"), None);
    }

    #[test]
    fn test_resolve_alias_chain() {
        let mut env = Environment::new();
        env.define("x", num_node(5.0));
        env.define("y", sym_node("x"));
        env.define("z", sym_node("y"));

        assert_eq!(env.resolve("z"), Some(&num_node(5.0)));
        assert_eq!(env.resolve("y"), Some(&num_node(5.0)));
        assert_eq!(env.resolve("x"), Some(&num_node(5.0)));
    }

    #[test]
    fn test_resolve_alias_only_sees_earlier_bindings() {
        // the scan continues below the alias, so a target bound later is
        // invisible to it
        let mut env = Environment::new();
        env.define("y", sym_node("x"));
        env.define("x", num_node(5.0));

        assert_eq!(env.resolve("y"), None);
        assert_eq!(env.resolve("x"), Some(&num_node(5.0)));
    }

    #[test]
    fn test_identifiers() {
        let mut env = Environment::new();
        env.define("fact", num_node(0.0));
        env.define("fib", num_node(0.0));
        let names = env.identifiers();
        assert!(names.contains("fact"));
        assert!(names.contains("fib"));
        assert_eq!(names.len(), 2);
    }
}
