//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Error, FileKind, Result, Vertex};

pub use crate::config::{MissingFilePolicy, PipelineConfig, RawConfig};

pub use crate::data::annotation::{parse_xml, Annotation};
pub use crate::data::coords::{open_coord_list, CoordList, CoordStore, NpzCoordStore, PatchCoord};
pub use crate::data::manifest::{load_manifest, ManifestFilter, ManifestRow, Stage, StageFilter};
pub use crate::data::slide::{ImageSlide, ImageSlideOpener, Slide, SlideOpener};
pub use crate::data::{home_dataset_dir, home_dataset_dir_with};

#[cfg(feature = "hdf5")]
pub use crate::data::coords::H5CoordStore;

pub use crate::select::{select_for_stage, select_random, NegativeBudget};

pub use crate::relevance::{calculate_iou, is_within_patch, PatchSquare, PolicyKind, RelevancePolicy};

pub use crate::patch::{parse_patch_file_name, patch_file_name, NamedPatch, NamingScheme, Patch};

pub use crate::pipeline::{Pipeline, RowOutcome, RowStatus, RunReport};

pub use crate::validate::{validate_patches, ValidationRecord};
