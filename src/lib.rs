//! # ctd-rs: Pairwise test generation with a temporal-logic oracle
//!
//! **`ctd-rs`** generates small test suites that cover every feasible **2-wise combination**
//! of factor values of a system, where feasibility is decided by a **model checker** over a
//! behavioral model rather than by hand-written constraints.
//!
//! ## How it works
//!
//! A *factor* is an abstract property of a test run (say, "the largest cart size reached"),
//! with a small value domain and one temporal atom per value. Every pair of values of two
//! distinct factors must either be realized by some generated test or be proven impossible.
//!
//! The engine asks the oracle whether an execution exists in which a given assignment of
//! factor values holds. A *feasible* verdict comes with a witness trace, which is turned
//! into a test: the sequence of actions taken, and the factor values read at the end. An
//! *infeasible* row is decomposed into its pairs to find out which of them are impossible.
//!
//! ## Key Features
//!
//! - **Two-phase Dynamic IPO**: a constraint-blind In-Parameter-Order covering array first,
//!   then dynamic completion of rows around each remaining pair. See [`engine`].
//! - **Proof-carrying classification**: a pair is [`Covered`][crate::pairs::PairState::Covered]
//!   only by an oracle-accepted row, and [`Infeasible`][crate::pairs::PairState::Infeasible]
//!   only by a pair-level proof. Everything else is reported as unresolved.
//! - **Pluggable oracle**: the [`Oracle`][crate::oracle::Oracle] trait, with a
//!   [nuXmv process backend][crate::nuxmv::NuXmvOracle] and an
//!   [in-process simulator][crate::simulate::SimulatedOracle].
//! - **Greedy minimization** of the accepted tests. See [`minimize`].
//!
//! ## Basic Usage
//!
//! ```rust
//! use ctd_rs::engine::RowEngine;
//! use ctd_rs::extract::TraceExtractor;
//! use ctd_rs::factor::{Factor, FactorId, FactorSpace};
//! use ctd_rs::formula::FormulaBuilder;
//! use ctd_rs::row::PartialRow;
//! use ctd_rs::simulate::SimulatedOracle;
//!
//! // 1. Describe the factors
//! let space = FactorSpace::new(vec![
//!     Factor::integer("a", "a", &[0, 1]),
//!     Factor::integer("b", "b", &[3, 4, 5]),
//!     Factor::integer("c", "c", &[0, 1]),
//! ])?;
//!
//! // 2. Anchor queries at the `end` flag, where tests are read
//! let formulas = FormulaBuilder::new(Some("end".to_string()));
//! let extractor = TraceExtractor::new("step").with_termination_flag(Some("end".to_string()));
//!
//! // 3. A stand-in oracle: the model never lets a=1 and c=0 hold together
//! let oracle = SimulatedOracle::new(space.clone(), "step", Some("end"), |row: &PartialRow| {
//!     !(row.get(FactorId::new(0)) == Some(1) && row.get(FactorId::new(2)) == Some(0))
//! });
//!
//! // 4. Run, then minimize
//! let outcome = RowEngine::new(&space, &formulas, &extractor, oracle).run()?;
//! let report = outcome.report();
//! assert_eq!(report.infeasible.len(), 1);
//! assert_eq!(report.covered.len(), 15);
//!
//! let suite = outcome.minimize();
//! assert!(suite.len() <= outcome.tests.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Core Components
//!
//! - **[`pairs`]**: the pair universe and its state machine.
//! - **[`engine`]**: the two-phase row engine.
//! - **[`formula`]**: query construction.
//! - **[`extract`]**: reading tests out of witness traces.
//! - **[`config`]** and **[`model`]**: JSON settings and the model contract check.

pub mod completion;
pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod factor;
pub mod formula;
pub mod ipo;
pub mod minimize;
pub mod model;
pub mod nuxmv;
pub mod oracle;
pub mod pairs;
pub mod report;
pub mod row;
pub mod simulate;
pub mod suite;
pub mod trace;
