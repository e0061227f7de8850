//! Declarative rule sets for the GLR parser.
//!
//! A `RuleSet` is a list of productions `name -> symbol*` with optional
//! semantic actions, declared in priority order (declaration order breaks
//! ambiguity ties during parse-forest evaluation). Terminals are token
//! ids; non-terminals are bare rule names. The set computes the classic
//! nullable/FIRST/FOLLOW triple; the parser uses FOLLOW to suppress
//! reductions on tokens that cannot legally follow a non-terminal.

use crate::tokenizer::{ID_EOF, Token};
use basil_core::Locus;
use std::collections::{HashMap, HashSet};

/// A grammar symbol: terminal (token id) or non-terminal (rule name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sym {
    T(&'static str),
    N(&'static str),
}

impl Sym {
    pub fn name(&self) -> &'static str {
        match self {
            Sym::T(n) | Sym::N(n) => n,
        }
    }
}

/// Values produced by semantic actions. The parser turns shifted tokens
/// into leaves with `from_token`; a completed rule without an action
/// yields its first child, or `empty()` when the rule is nullary.
pub trait SemanticValue: Sized {
    fn from_token(token: &Token) -> Self;
    fn empty() -> Self;
}

/// A semantic action: consumes the child values of a completed rule.
pub type Action<V> = Box<dyn Fn(Vec<V>, Locus) -> Result<V, String>>;

/// One production.
pub struct Rule<V> {
    pub id: usize,
    pub name: &'static str,
    pub symbols: Vec<Sym>,
    pub action: Option<Action<V>>,
}

/// The distinguished start non-terminal added by `finish`.
pub const START: &str = "_start";

/// A complete grammar: productions plus the FOLLOW table.
pub struct RuleSet<V> {
    rules: Vec<Rule<V>>,
    by_name: HashMap<&'static str, Vec<usize>>,
    follow: HashMap<&'static str, HashSet<&'static str>>,
    start_rule: usize,
}

impl<V> RuleSet<V> {
    /// Start building a grammar.
    pub fn builder() -> RuleSetBuilder<V> {
        RuleSetBuilder { rules: Vec::new() }
    }

    pub fn rules(&self) -> &[Rule<V>] {
        &self.rules
    }

    pub fn rule(&self, id: usize) -> &Rule<V> {
        &self.rules[id]
    }

    /// Rule ids producing the given non-terminal.
    pub fn rules_for(&self, name: &str) -> &[usize] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_nonterminal(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// The id of the augmented `_start -> <entry>` rule.
    pub fn start_rule(&self) -> usize {
        self.start_rule
    }

    /// May `token` legally follow `name` in some derivation?
    pub fn follow_allows(&self, name: &str, token: &str) -> bool {
        self.follow.get(name).map(|s| s.contains(token)).unwrap_or(false)
    }

    #[cfg(test)]
    pub fn follow_set(&self, name: &str) -> Option<&HashSet<&'static str>> {
        self.follow.get(name)
    }
}

pub struct RuleSetBuilder<V> {
    rules: Vec<Rule<V>>,
}

impl<V> RuleSetBuilder<V> {
    /// Add a production without an action (value: first child or empty).
    pub fn add(&mut self, name: &'static str, symbols: Vec<Sym>) {
        self.push_rule(name, symbols, None);
    }

    /// Add a production with a semantic action.
    pub fn act(
        &mut self,
        name: &'static str,
        symbols: Vec<Sym>,
        action: impl Fn(Vec<V>, Locus) -> Result<V, String> + 'static,
    ) {
        self.push_rule(name, symbols, Some(Box::new(action)));
    }

    fn push_rule(&mut self, name: &'static str, symbols: Vec<Sym>, action: Option<Action<V>>) {
        let id = self.rules.len();
        self.rules.push(Rule { id, name, symbols, action });
    }

    /// Augment with `_start -> entry`, compute FOLLOW, and seal the set.
    pub fn finish(mut self, entry: &'static str) -> RuleSet<V> {
        let start_rule = self.rules.len();
        self.push_rule(START, vec![Sym::N(entry)], None);

        let mut by_name: HashMap<&'static str, Vec<usize>> = HashMap::new();
        for rule in &self.rules {
            by_name.entry(rule.name).or_default().push(rule.id);
        }

        let follow = compute_follow(&self.rules, &by_name);
        RuleSet { rules: self.rules, by_name, follow, start_rule }
    }
}

/// Nullable/FIRST/FOLLOW by fixpoint iteration.
fn compute_follow<V>(
    rules: &[Rule<V>],
    by_name: &HashMap<&'static str, Vec<usize>>,
) -> HashMap<&'static str, HashSet<&'static str>> {
    let nullable = compute_nullable(rules, by_name);
    let first = compute_first(rules, by_name, &nullable);

    let mut follow: HashMap<&'static str, HashSet<&'static str>> = HashMap::new();
    for name in by_name.keys() {
        follow.insert(*name, HashSet::new());
    }
    if let Some(set) = follow.get_mut(START) {
        set.insert(ID_EOF);
    }

    let mut changed = true;
    while changed {
        changed = false;
        for rule in rules {
            for (i, sym) in rule.symbols.iter().enumerate() {
                let Sym::N(target) = *sym else { continue };
                // FOLLOW(target) gains FIRST of what can come after it...
                let mut rest_nullable = true;
                let mut additions: HashSet<&'static str> = HashSet::new();
                for later in &rule.symbols[i + 1..] {
                    match *later {
                        Sym::T(t) => {
                            additions.insert(t);
                            rest_nullable = false;
                        }
                        Sym::N(n) => {
                            if let Some(f) = first.get(n) {
                                additions.extend(f.iter().copied());
                            }
                            if !nullable.contains(n) {
                                rest_nullable = false;
                            }
                        }
                    }
                    if !rest_nullable {
                        break;
                    }
                }
                // ...and, when the rest can vanish, FOLLOW of the LHS.
                if rest_nullable {
                    if let Some(f) = follow.get(rule.name) {
                        additions.extend(f.iter().copied());
                    }
                }
                let set = follow.entry(target).or_default();
                for a in additions {
                    changed |= set.insert(a);
                }
            }
        }
    }
    follow
}

fn compute_nullable<V>(
    rules: &[Rule<V>],
    by_name: &HashMap<&'static str, Vec<usize>>,
) -> HashSet<&'static str> {
    let _ = by_name;
    let mut nullable: HashSet<&'static str> = HashSet::new();
    let mut changed = true;
    while changed {
        changed = false;
        for rule in rules {
            if nullable.contains(rule.name) {
                continue;
            }
            let all_nullable = rule.symbols.iter().all(|s| match s {
                Sym::T(_) => false,
                Sym::N(n) => nullable.contains(n),
            });
            if all_nullable {
                nullable.insert(rule.name);
                changed = true;
            }
        }
    }
    nullable
}

fn compute_first<V>(
    rules: &[Rule<V>],
    by_name: &HashMap<&'static str, Vec<usize>>,
    nullable: &HashSet<&'static str>,
) -> HashMap<&'static str, HashSet<&'static str>> {
    let mut first: HashMap<&'static str, HashSet<&'static str>> = HashMap::new();
    for name in by_name.keys() {
        first.insert(*name, HashSet::new());
    }
    let mut changed = true;
    while changed {
        changed = false;
        for rule in rules {
            let mut additions: HashSet<&'static str> = HashSet::new();
            for sym in &rule.symbols {
                match *sym {
                    Sym::T(t) => {
                        additions.insert(t);
                        break;
                    }
                    Sym::N(n) => {
                        if let Some(f) = first.get(n) {
                            additions.extend(f.iter().copied());
                        }
                        if !nullable.contains(n) {
                            break;
                        }
                    }
                }
            }
            let set = first.entry(rule.name).or_default();
            for a in additions {
                changed |= set.insert(a);
            }
        }
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;

    impl SemanticValue for i64 {
        fn from_token(token: &Token) -> Self {
            token.text.parse().unwrap_or(0)
        }
        fn empty() -> Self {
            0
        }
    }

    /// expr -> expr '+' term | term ; term -> 'integer'
    fn arith() -> RuleSet<i64> {
        let mut g = RuleSet::<i64>::builder();
        g.act("expr", vec![Sym::N("expr"), Sym::T("+"), Sym::N("term")], |c, _| {
            Ok(c[0] + c[2])
        });
        g.add("expr", vec![Sym::N("term")]);
        g.add("term", vec![Sym::T("integer")]);
        g.finish("expr")
    }

    #[test]
    fn follow_contains_continuations_and_eof() {
        let g = arith();
        let f = g.follow_set("expr").unwrap();
        assert!(f.contains("+"));
        assert!(f.contains(ID_EOF));
        let f = g.follow_set("term").unwrap();
        assert!(f.contains("+"));
        assert!(f.contains(ID_EOF));
    }

    #[test]
    fn nullable_rules_propagate_into_follow() {
        // list -> item tail ; tail -> ',' item tail | ε
        let mut g = RuleSet::<i64>::builder();
        g.add("list", vec![Sym::N("item"), Sym::N("tail")]);
        g.add("tail", vec![Sym::T(","), Sym::N("item"), Sym::N("tail")]);
        g.add("tail", vec![]);
        g.add("item", vec![Sym::T("integer")]);
        let g = g.finish("list");
        // item is followed by ',' (from tail) and eof (tail nullable).
        let f = g.follow_set("item").unwrap();
        assert!(f.contains(","));
        assert!(f.contains(ID_EOF));
    }

    #[test]
    fn rules_for_groups_productions_by_name() {
        let g = arith();
        assert_eq!(g.rules_for("expr").len(), 2);
        assert_eq!(g.rules_for("term").len(), 1);
        assert_eq!(g.rules_for(START).len(), 1);
    }
}
