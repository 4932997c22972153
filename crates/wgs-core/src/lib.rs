//! wgs-core: locate Game Pass (WGS) save containers and turn them into Steam saves
//!
//! This crate focuses on a small, well-factored surface:
//! - Container model and WGS root discovery (ordered resolution strategies)
//! - Payload selection (WGS index / metadata reference, else largest blob)
//! - Conversion to `gamepass_save_<id>.zks`, verbatim or re-assembled
//! - Batch conversion with a per-container report
//!
pub mod archive;
pub mod container;
pub mod convert;
pub mod error;
pub mod index;
pub mod locate;
pub mod payload;

pub use container::{BlobEntry, SaveContainer, is_metadata_name};
pub use convert::{
    BatchReport, ConvertOptions, ConvertedSave, Outcome, OutputMode, convert_all,
    convert_container, ensure_dest_dir, output_file_name, probe, sanitize_id,
};
pub use error::{ConvertError, LocateError};
pub use index::{IndexEntry, build_index_bytes, parse_index};
pub use locate::{
    Locator, RootStrategy, default_destination, default_strategies, resolve_root, user_profile,
};
pub use payload::{PayloadChoice, SelectionRule, largest_blob, select_payload, text_reference};
