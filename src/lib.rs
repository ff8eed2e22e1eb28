//! # quotient-filter
//!
//! [![License: MIT](https://img.shields.io/badge/License-MIT-yellow.svg)](https://opensource.org/licenses/MIT)
//!
//! `quotient-filter` is a space-efficient probabilistic data structure for approximate
//! membership queries over pre-hashed fingerprints. Unlike a bloom filter, a quotient filter
//! supports deletion and can be merged and resized, at the cost of slightly worse cache
//! locality for very low load factors.
//!
//! This crate does not hash keys for you: callers reduce their own keys to uniformly
//! distributed `u64` fingerprints and pass them directly to
//! [`QuotientFilter::insert`](quotient::QuotientFilter::insert),
//! [`may_contain`](quotient::QuotientFilter::may_contain), and
//! [`remove`](quotient::QuotientFilter::remove).
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! quotient-filter = "*"
//! ```
//!
//! ```rust
//! use quotient_filter::quotient::QuotientFilter;
//!
//! let mut filter = QuotientFilter::from_fpp(100, 0.01).unwrap();
//! filter.insert(0xDEADBEEF);
//! assert!(filter.may_contain(0xDEADBEEF));
//! assert!(!filter.may_contain(0xCAFE));
//! ```
//!
//! ## References
//!
//!  - [A General-Purpose Counting Filter: Making Every Bit Count](https://www3.cs.stonybrook.edu/~ppandey/files/p775-pandey.pdf)
//!  > Pandey, Prashant, Michael A. Bender, Rob Johnson, and Rob Patro. 2017. “A General-Purpose
//!  > Counting Filter: Making Every Bit Count.” In *Proceedings of the 2017 ACM International
//!  > Conference on Management of Data*, 775–87. SIGMOD ’17. New York, NY, USA: ACM.
//!  > doi:[10.1145/3035918.3035963](https://doi.org/10.1145/3035918.3035963).
//!  - [Don't Thrash: How to Cache Your Hash on Flash](http://www.vldb.org/pvldb/vol5/p1627_michaelabender_vldb2012.pdf)
//!  > Bender, Michael A., Martin Farach-Colton, Rob Johnson, Russell Kraner, Bradley C. Kuszmaul,
//!  > Dzejla Medjedovic, Pablo Montes, Pradeep Shetty, Richard P. Spillane, and Erez Zadok. 2012.
//!  > “Don’t Thrash: How to Cache Your Hash on Flash.” *Proc. VLDB Endow.* 5 (11). VLDB
//!  > Endowment: 1627–37. doi:[10.14778/2350229.2350275](https://doi.org/10.14778/2350229.2350275).

#![warn(missing_docs)]

pub mod error;
pub mod quotient;
mod slot_array;
