//! Narrative generation
//!
//! - [`selector`]: per-channel tier selection and sentence filling
//! - [`composer`]: report assembly in fixed section order

pub mod composer;
pub mod selector;

pub use composer::{InvestorDigest, NarrativeComposer, NarrativeReport, Section, SectionKind};
pub use selector::{Icon, MetricStory, StoryChannel, TemplateSelector, TierKey, Tone};
