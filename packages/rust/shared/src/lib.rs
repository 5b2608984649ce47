//! Shared types, error model, and configuration for Letterpress.
//!
//! This crate is the foundation depended on by all other Letterpress crates.
//! It provides:
//! - [`LetterpressError`]: the unified error type
//! - Domain types ([`ParsedTemplate`], [`EditableElement`], [`LockedSection`], [`EditId`])
//! - Configuration ([`AppConfig`], [`ParseOptions`], [`EditOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, EditOptions, ParseOptions, Thresholds, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{LetterpressError, Result};
pub use types::{
    ColorUsage, EDIT_ID_ATTR, EditId, EditableElement, EditableField, ElementKind,
    ExtractedColor, FieldName, FieldType, LinkMeta, LockedSection, ParsedTemplate, SectionType,
    TextStyles,
};
