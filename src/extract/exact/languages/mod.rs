//! Per-language syntax extractors.

mod go;
mod python;
mod rust_lang;

pub use go::GoSyntax;
pub use python::PythonSyntax;
pub use rust_lang::RustSyntax;
