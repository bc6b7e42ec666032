//! Pipeline stages that turn one PDF into note-ready Markdown.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and swapped behind its trait seam.
//!
//! ## Data Flow
//!
//! ```text
//!             ┌─▶ text (pdfium) ──────────────────────┐
//! input ──────┤   text-bearing                        ├──▶ generator
//! (*.pdf)     └─▶ easydoc (HTTP) ──▶ blocks (render) ─┘
//!                 image-only / routing = remote
//! ```
//!
//! 1. [`input`]: list `*.pdf` in the input directory, sorted by name
//! 2. [`text`]: read the text layer; decides text-bearing vs image-only
//!    and provides the extracted text; runs in `spawn_blocking`
//! 3. [`easydoc`]: upload to the remote parser with bounded retry
//! 4. [`blocks`]: rebuild the parser's block hierarchy and render Markdown

pub mod blocks;
pub mod easydoc;
pub mod input;
pub mod text;
