//! Generalized LR(0) parser with a graph-structured stack.
//!
//! The dialect's grammar is ambiguous where classic LR parsers conflict
//! (function call vs array access, single-line vs block IF, optional
//! separators), so the parser runs all viable stacks at once:
//!
//! - LR(0) items `(rule, dot)` are keyed `r<id>_<pos>`; states are item
//!   closures interned by their sorted key set, with lazily memoized GOTO
//!   tables.
//! - The runtime stack is a graph: shift nodes for terminals, reduce
//!   nodes for non-terminals. Merged shift targets and packed reduce
//!   alternatives (inodes) keep the forest shared.
//! - Reductions are filtered by FOLLOW membership of the lookahead and a
//!   reprocess guard; a stuck parse reports the terminals the live states
//!   expected.
//!
//! Evaluation runs bottom-up over the chosen derivations. When a reduce
//! node packs more than one derivation the rule with the smallest
//! declaration id wins and a diagnostic is logged.

use crate::grammar::{RuleSet, SemanticValue, Sym};
use crate::tokenizer::Token;
use basil_core::Locus;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::rc::Rc;

/// A fatal parse failure: bad character, stuck state, unaccepted EOF, or
/// a semantic action that rejected its children.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub locus: Locus,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ParseError {}

type Item = (usize, usize); // (rule id, dot position)

fn item_key(item: Item) -> String {
    format!("r{}_{}", item.0, item.1)
}

/// An interned closure of LR(0) items.
struct State {
    items: Vec<Item>,
    /// Rule ids whose dot sits at the end.
    reductions: Vec<usize>,
    accepting: bool,
    gotos: RefCell<HashMap<Sym, Option<Rc<State>>>>,
}

enum NodeKind {
    /// A shifted terminal.
    Shift { sym: &'static str, text: String },
    /// A completed non-terminal; alternatives packed in `inodes`.
    Reduce { name: &'static str, inodes: RefCell<Vec<Inode>> },
}

/// One derivation of a reduce node: the rule and its child nodes in
/// left-to-right order.
struct Inode {
    rule: usize,
    children: Vec<Rc<Node>>,
}

struct Node {
    state: Rc<State>,
    locus: Locus,
    parents: RefCell<Vec<Rc<Node>>>,
    kind: NodeKind,
}

/// The GLR parser for one grammar. States are built on demand and cached
/// for the parser's lifetime, so parsing many programs with one parser
/// amortizes table construction.
pub struct Parser<'g, V: SemanticValue> {
    grammar: &'g RuleSet<V>,
    states: RefCell<HashMap<String, Rc<State>>>,
    start: Rc<State>,
}

impl<'g, V: SemanticValue> Parser<'g, V> {
    pub fn new(grammar: &'g RuleSet<V>) -> Self {
        let states = RefCell::new(HashMap::new());
        let start = Self::closure_in(grammar, &states, vec![(grammar.start_rule(), 0)]);
        Parser { grammar, states, start }
    }

    /// Parse a token stream (must be EOF-terminated, as `tokenize`
    /// produces) and evaluate the accepted tree to a semantic value.
    pub fn parse(&self, tokens: &[Token]) -> Result<V, ParseError> {
        let bottom = Rc::new(Node {
            state: Rc::clone(&self.start),
            locus: Locus::new(1, 1),
            parents: RefCell::new(Vec::new()),
            kind: NodeKind::Shift { sym: "", text: String::new() },
        });
        let mut tops: Vec<Rc<Node>> = vec![bottom];

        for tok in tokens {
            self.reduce_all(&mut tops, tok);

            if tok.is_eof() {
                if let Some(accepted) = tops.iter().find(|t| t.state.accepting) {
                    return self.evaluate(accepted);
                }
                return Err(self.syntax_error(&tops, tok));
            }

            let mut next: Vec<Rc<Node>> = Vec::new();
            for top in &tops {
                let Some(target) = self.goto(&top.state, Sym::T(tok.id)) else { continue };
                if let Some(existing) = next.iter().find(|n| Rc::ptr_eq(&n.state, &target)) {
                    let mut parents = existing.parents.borrow_mut();
                    if !parents.iter().any(|p| Rc::ptr_eq(p, top)) {
                        parents.push(Rc::clone(top));
                    }
                } else {
                    next.push(Rc::new(Node {
                        state: target,
                        locus: tok.locus,
                        parents: RefCell::new(vec![Rc::clone(top)]),
                        kind: NodeKind::Shift { sym: tok.id, text: tok.text.clone() },
                    }));
                }
            }
            if next.is_empty() {
                return Err(self.syntax_error(&tops, tok));
            }
            tops = next;
        }

        // tokenize() always ends the stream with EOF; getting here means
        // the caller handed us a truncated stream.
        Err(ParseError {
            message: "token stream ended without EOF".to_string(),
            locus: Locus::new(1, 1),
        })
    }

    // ------------------------------------------------------------------
    // State construction
    // ------------------------------------------------------------------

    fn closure(&self, kernel: Vec<Item>) -> Rc<State> {
        Self::closure_in(self.grammar, &self.states, kernel)
    }

    fn closure_in(
        grammar: &RuleSet<V>,
        states: &RefCell<HashMap<String, Rc<State>>>,
        kernel: Vec<Item>,
    ) -> Rc<State> {
        let mut set: HashSet<Item> = kernel.iter().copied().collect();
        let mut work: Vec<Item> = kernel;
        while let Some((rule, dot)) = work.pop() {
            if let Some(Sym::N(name)) = grammar.rule(rule).symbols.get(dot) {
                for &rid in grammar.rules_for(name) {
                    if set.insert((rid, 0)) {
                        work.push((rid, 0));
                    }
                }
            }
        }
        let mut items: Vec<Item> = set.into_iter().collect();
        items.sort_unstable();
        let key: String =
            items.iter().map(|&i| item_key(i)).collect::<Vec<_>>().join(",");

        if let Some(state) = states.borrow().get(&key) {
            return Rc::clone(state);
        }
        let reductions: Vec<usize> = items
            .iter()
            .filter(|&&(rule, dot)| dot == grammar.rule(rule).symbols.len())
            .map(|&(rule, _)| rule)
            .collect();
        let accepting = items.contains(&(grammar.start_rule(), 1));
        let state = Rc::new(State {
            items,
            reductions,
            accepting,
            gotos: RefCell::new(HashMap::new()),
        });
        states.borrow_mut().insert(key, Rc::clone(&state));
        state
    }

    fn goto(&self, state: &State, sym: Sym) -> Option<Rc<State>> {
        if let Some(cached) = state.gotos.borrow().get(&sym) {
            return cached.clone();
        }
        let kernel: Vec<Item> = state
            .items
            .iter()
            .filter(|&&(rule, dot)| self.grammar.rule(rule).symbols.get(dot) == Some(&sym))
            .map(|&(rule, dot)| (rule, dot + 1))
            .collect();
        let result = if kernel.is_empty() { None } else { Some(self.closure(kernel)) };
        state.gotos.borrow_mut().insert(sym, result.clone());
        result
    }

    // ------------------------------------------------------------------
    // The graph-structured stack
    // ------------------------------------------------------------------

    /// Run every reduction applicable under the lookahead, recursively,
    /// merging reduce nodes that land on the same state. A node is
    /// processed at most once per token (the cycle check).
    fn reduce_all(&self, tops: &mut Vec<Rc<Node>>, lookahead: &Token) {
        let mut queue: VecDeque<Rc<Node>> = tops.iter().cloned().collect();
        let mut processed: HashSet<*const Node> = HashSet::new();

        while let Some(node) = queue.pop_front() {
            if !processed.insert(Rc::as_ptr(&node)) {
                continue;
            }
            for &rid in &node.state.reductions {
                if rid == self.grammar.start_rule() {
                    continue; // completion of _start is acceptance, not a reduction
                }
                let rule = self.grammar.rule(rid);
                if !self.grammar.follow_allows(rule.name, lookahead.id) {
                    continue;
                }
                for (children, anchor) in paths(&node, rule.symbols.len()) {
                    let Some(target) = self.goto(&anchor.state, Sym::N(rule.name)) else {
                        continue;
                    };
                    let locus =
                        children.first().map(|c| c.locus).unwrap_or(lookahead.locus);
                    if let Some(existing) =
                        tops.iter().find(|t| Rc::ptr_eq(&t.state, &target))
                    {
                        if let NodeKind::Reduce { inodes, .. } = &existing.kind {
                            {
                                let mut parents = existing.parents.borrow_mut();
                                if !parents.iter().any(|p| Rc::ptr_eq(p, &anchor)) {
                                    parents.push(Rc::clone(&anchor));
                                }
                            }
                            let mut inodes = inodes.borrow_mut();
                            let duplicate = inodes.iter().any(|i| {
                                i.rule == rid && same_nodes(&i.children, &children)
                            });
                            if !duplicate {
                                inodes.push(Inode { rule: rid, children });
                            }
                        }
                        // An already-processed node is not requeued.
                    } else {
                        let fresh = Rc::new(Node {
                            state: target,
                            locus,
                            parents: RefCell::new(vec![Rc::clone(&anchor)]),
                            kind: NodeKind::Reduce {
                                name: rule.name,
                                inodes: RefCell::new(vec![Inode { rule: rid, children }]),
                            },
                        });
                        tops.push(Rc::clone(&fresh));
                        queue.push_back(fresh);
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    fn evaluate(&self, node: &Rc<Node>) -> Result<V, ParseError> {
        match &node.kind {
            NodeKind::Shift { sym, text } => {
                let token = Token { id: *sym, text: text.clone(), locus: node.locus };
                Ok(V::from_token(&token))
            }
            NodeKind::Reduce { name, inodes } => {
                let (rule_id, children) = {
                    let inodes = inodes.borrow();
                    if inodes.len() > 1 {
                        tracing::debug!(
                            "ambiguous parse of {} at {}: {} derivations, \
                             picking the earliest-declared rule",
                            name,
                            node.locus,
                            inodes.len()
                        );
                    }
                    let chosen =
                        inodes.iter().min_by_key(|i| i.rule).ok_or_else(|| ParseError {
                            message: format!("empty derivation of {} at {}", name, node.locus),
                            locus: node.locus,
                        })?;
                    (chosen.rule, chosen.children.clone())
                };
                let mut values = Vec::with_capacity(children.len());
                for child in &children {
                    values.push(self.evaluate(child)?);
                }
                let rule = self.grammar.rule(rule_id);
                match &rule.action {
                    Some(action) => action(values, node.locus).map_err(|message| ParseError {
                        message,
                        locus: node.locus,
                    }),
                    None => Ok(values.into_iter().next().unwrap_or_else(V::empty)),
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// `Syntax error at L:C`, with the terminals the live states could
    /// have shifted.
    fn syntax_error(&self, tops: &[Rc<Node>], tok: &Token) -> ParseError {
        let mut expected: Vec<&'static str> = Vec::new();
        for top in tops {
            for &(rule, dot) in &top.state.items {
                if let Some(&Sym::T(t)) = self.grammar.rule(rule).symbols.get(dot) {
                    if !expected.contains(&t) {
                        expected.push(t);
                    }
                }
            }
        }
        expected.sort_unstable();
        let mut message = format!("Syntax error at {}", tok.locus);
        if !expected.is_empty() {
            let list: Vec<String> = expected.iter().map(|t| format!("'{}'", t)).collect();
            message.push_str(&format!(": unexpected {}, expected {}", tok, list.join(", ")));
        }
        ParseError { message, locus: tok.locus }
    }
}

/// All length-`n` child paths ending at `node`, each with the anchor the
/// reduction restarts from (a parent of the leftmost child). `n == 0`
/// anchors an empty production at the node itself.
fn paths(node: &Rc<Node>, n: usize) -> Vec<(Vec<Rc<Node>>, Rc<Node>)> {
    let mut out = Vec::new();
    if n == 0 {
        out.push((Vec::new(), Rc::clone(node)));
        return out;
    }
    let mut acc: Vec<Rc<Node>> = Vec::new();
    collect_paths(node, n, &mut acc, &mut out);
    out
}

fn collect_paths(
    node: &Rc<Node>,
    remaining: usize,
    acc: &mut Vec<Rc<Node>>,
    out: &mut Vec<(Vec<Rc<Node>>, Rc<Node>)>,
) {
    acc.push(Rc::clone(node));
    if remaining == 1 {
        for parent in node.parents.borrow().iter() {
            let children: Vec<Rc<Node>> = acc.iter().rev().cloned().collect();
            out.push((children, Rc::clone(parent)));
        }
    } else {
        let parents: Vec<Rc<Node>> = node.parents.borrow().iter().cloned().collect();
        for parent in &parents {
            collect_paths(parent, remaining - 1, acc, out);
        }
    }
    acc.pop();
}

fn same_nodes(a: &[Rc<Node>], b: &[Rc<Node>]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Rc::ptr_eq(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::RuleSet;
    use crate::tokenizer::Tokenizer;

    fn toks(src: &str) -> Vec<Token> {
        Tokenizer::new(src).tokenize().unwrap()
    }

    /// Unambiguous left-recursive sums over integer tokens.
    fn sums() -> RuleSet<i64> {
        let mut g = RuleSet::<i64>::builder();
        g.act("expr", vec![Sym::N("expr"), Sym::T("+"), Sym::N("term")], |c, _| {
            Ok(c[0] + c[2])
        });
        g.add("expr", vec![Sym::N("term")]);
        g.add("term", vec![Sym::T("integer")]);
        g.finish("expr")
    }

    #[test]
    fn parses_and_evaluates_left_recursion() {
        let g = sums();
        let p = Parser::new(&g);
        assert_eq!(p.parse(&toks("1 + 2 + 39")).unwrap(), 42);
    }

    #[test]
    fn stuck_parse_reports_expected_terminals() {
        let g = sums();
        let p = Parser::new(&g);
        let err = p.parse(&toks("1 + +")).unwrap_err();
        assert!(err.message.starts_with("Syntax error at 1:5"), "{}", err.message);
        assert!(err.message.contains("'integer'"), "{}", err.message);
    }

    #[test]
    fn unaccepted_eof_is_a_syntax_error() {
        let g = sums();
        let p = Parser::new(&g);
        let err = p.parse(&toks("1 +")).unwrap_err();
        assert!(err.message.starts_with("Syntax error"), "{}", err.message);
    }

    #[test]
    fn ambiguous_grammar_packs_and_picks_earliest_rule() {
        // expr -> expr '+' expr | 'integer': a textbook ambiguous grammar.
        // Both associativities parse; evaluation must pick one
        // deterministically (sum is associative, so the value agrees).
        let mut g = RuleSet::<i64>::builder();
        g.act("expr", vec![Sym::N("expr"), Sym::T("+"), Sym::N("expr")], |c, _| {
            Ok(c[0] + c[2])
        });
        g.add("expr", vec![Sym::T("integer")]);
        let g = g.finish("expr");
        let p = Parser::new(&g);
        assert_eq!(p.parse(&toks("1 + 2 + 3")).unwrap(), 6);
    }

    #[test]
    fn same_input_evaluates_identically_across_runs() {
        let g = sums();
        let p = Parser::new(&g);
        let a = p.parse(&toks("1 + 2")).unwrap();
        let b = p.parse(&toks("1 + 2")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn nullable_productions_reduce_at_the_anchor() {
        // list -> item tail ; tail -> ',' item tail | ε
        let mut g = RuleSet::<i64>::builder();
        g.act("list", vec![Sym::N("item"), Sym::N("tail")], |c, _| Ok(c[0] + c[1]));
        g.act("tail", vec![Sym::T(","), Sym::N("item"), Sym::N("tail")], |c, _| {
            Ok(c[1] + c[2])
        });
        g.add("tail", vec![]);
        g.add("item", vec![Sym::T("integer")]);
        let g = g.finish("list");
        let p = Parser::new(&g);
        assert_eq!(p.parse(&toks("1, 2, 3")).unwrap(), 6);
        assert_eq!(p.parse(&toks("4")).unwrap(), 4);
    }
}
