//! Congruence-closing e-graphs over uninterpreted first-order terms
//!
//! A [`Graph`] compactly represents a set of equivalent ground terms,
//! supporting incremental term addition and class merging while keeping the
//! congruence closure invariant: equal arguments under the same symbol imply
//! equal classes. The supporting containers (an insert-only red-black
//! [ordered map](ord_map) and a payload-carrying
//! [disjoint-set forest](union_find)) are part of the crate's public
//! surface.

#![deny(
    clippy::disallowed_methods,
    clippy::suspicious,
    clippy::style,
    clippy::clone_on_ref_ptr,
    missing_debug_implementations,
    missing_copy_implementations
)]
#![warn(clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod egraph;
pub mod ord_map;
pub mod term;
pub mod union_find;

pub use egraph::{ClassId, ENode, Graph};
pub use term::Term;

#[cfg(any(test, feature = "proptest"))]
pub mod prop {
    //! Proptest strategies over terms

    use proptest::prelude::*;

    use crate::term::Term;

    /// Strategy over a deliberately small symbol alphabet, so that generated
    /// terms collide often
    pub fn symbol() -> impl Strategy<Value = String> + Clone { "[a-e]" }

    /// Strategy over ground terms of bounded depth, total size, and fanout
    pub fn term(depth: u32, size: u32, branch: u32) -> impl Strategy<Value = Term> {
        symbol()
            .prop_map(Term::leaf)
            .prop_recursive(depth, size, branch, move |inner| {
                (
                    symbol(),
                    prop::collection::vec(inner, 0..=(branch.try_into().unwrap())),
                )
                    .prop_map(|(symbol, args)| Term::new(symbol, args))
            })
    }
}
