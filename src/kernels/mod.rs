//! Symbol-model kernels.
//!
//! Each kernel implements the `SymbolModel`/`SymbolCoder` pair from
//! `crate::traits`. The engines are generic over the model, so a new coding
//! rule only needs a new module here.

pub mod ase;

pub use ase::{AseCoder, AseModel, LookupTable};
