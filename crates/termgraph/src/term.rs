//! First-order ground terms and their shortlex total order

use std::{cmp::Ordering, fmt, rc::Rc};

/// An immutable n-ary term: a symbol applied to an ordered list of argument
/// terms. A term with no arguments is nullary.
///
/// Terms compare by shortlex order: argument count first, then symbol, then
/// the arguments pointwise.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Term {
    symbol: Rc<str>,
    args: Vec<Term>,
}

impl Term {
    pub fn new(symbol: impl Into<Rc<str>>, args: Vec<Term>) -> Self {
        Self {
            symbol: symbol.into(),
            args,
        }
    }

    /// Construct a nullary term
    #[inline]
    pub fn leaf(symbol: impl Into<Rc<str>>) -> Self { Self::new(symbol, vec![]) }

    /// Construct a flat application of nullary arguments, e.g.
    /// `Term::apply("f", ["x", "y"])` for `f(x,y)`
    pub fn apply<S: Into<Rc<str>>, I: IntoIterator<Item = S>>(symbol: S, args: I) -> Self {
        Self::new(symbol, args.into_iter().map(Term::leaf).collect())
    }

    #[must_use]
    pub fn symbol(&self) -> &str { &self.symbol }

    #[must_use]
    pub fn args(&self) -> &[Term] { &self.args }

    pub(crate) fn symbol_shared(&self) -> &Rc<str> { &self.symbol }
}

impl Ord for Term {
    fn cmp(&self, other: &Self) -> Ordering {
        let Self { symbol, args } = self;
        args.len()
            .cmp(&other.args.len())
            .then_with(|| symbol.as_ref().cmp(other.symbol.as_ref()))
            .then_with(|| args.cmp(&other.args))
    }
}

impl PartialOrd for Term {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)?;
        if !self.args.is_empty() {
            f.write_str("(")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }

                fmt::Display::fmt(arg, f)?;
            }
            f.write_str(")")?;
        }

        Ok(())
    }
}

impl fmt::Debug for Term {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { fmt::Display::fmt(self, f) }
}

#[cfg(test)]
mod test {
    use super::Term;

    #[test]
    fn display_renders_applications() {
        assert_eq!(Term::leaf("a").to_string(), "a");
        assert_eq!(Term::apply("f", ["x", "y"]).to_string(), "f(x,y)");
        assert_eq!(
            Term::new("g", vec![Term::apply("f", ["x"]), Term::leaf("z")]).to_string(),
            "g(f(x),z)"
        );
    }

    #[test]
    fn shortlex_orders_by_arity_first() {
        // z is a leaf, so it sorts below any application regardless of symbol
        assert!(Term::leaf("z") < Term::apply("a", ["b"]));
        assert!(Term::apply("f", ["x"]) < Term::apply("f", ["x", "y"]));
    }

    #[test]
    fn shortlex_orders_by_symbol_within_arity() {
        assert!(Term::leaf("a") < Term::leaf("b"));
        assert!(Term::apply("f", ["x", "y"]) < Term::apply("g", ["a", "b"]));
    }

    #[test]
    fn shortlex_orders_by_args_last() {
        assert!(Term::apply("f", ["a", "b"]) < Term::apply("f", ["a", "c"]));
        assert_eq!(
            Term::apply("f", ["a", "b"]).cmp(&Term::apply("f", ["a", "b"])),
            std::cmp::Ordering::Equal
        );
    }
}
