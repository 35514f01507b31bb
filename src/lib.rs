//! Batch conversion of Word documents (`.docx`, and `.doc` through
//! LibreOffice) into Markdown, mirroring the input folder structure.
//!
//! Each `<name>.docx` becomes `<name>.md`; embedded images are written to a
//! sibling `<name>_files/` folder as `image1.png`, `image2.jpg`, ...

pub mod batch;
pub mod cleanup;
pub mod converter;
pub mod discover;
pub mod docx_html;
pub mod error;
pub mod html;
pub mod image;
pub mod legacy;
pub mod markdown;

pub use batch::{
    run_batch, run_batch_with_progress, run_file, BatchOptions, CancellationToken,
    ConversionReport, Failure,
};
pub use converter::convert_document;
pub use error::ConvertError;
