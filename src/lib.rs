//! Core library for the aideon-sheetcsv command line application.
//!
//! The library turns the first sheet of a workbook into a rectangular CSV
//! table with one consistent type per column. Column type resolution lives in
//! [`aideon::tools::resolve`], the per-type value normalizers in
//! [`aideon::tools::normalize`], row assembly and column error reporting in
//! [`aideon::tools::table`], workbook and CSV adapters under
//! [`aideon::tools::io`], and file-level orchestration in
//! [`aideon::tools::convert`].

pub mod aideon;

pub use aideon::tools::{
    NormalizeError, Result, ToolError, convert, error, io, model, normalize, resolve, table,
};
