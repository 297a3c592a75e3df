//! # idcard-forge – Para sports athlete ID cards
//!
//! This crate lays out, renders and delivers the printable photo ID card of
//! a registered para-sports athlete. The pipeline stages are:
//!
//! 1. **Assets** – load the profile photo and cached logo ([`assets`])
//! 2. **Layout** – record → ordered draw list on a 650×400 canvas ([`layout`], [`card`])
//! 3. **Render** – draw list → single-page PDF via printpdf ([`render`])
//! 4. **Store** – write the PDF under a unique name ([`documents`])
//! 5. **Deliver** – persist the card status and email the athlete ([`delivery`], [`notify`])
//!
//! [`service::CardService`] ties the stages together behind the operations a
//! request handler needs, and [`retention`] removes old cards in the
//! background.

pub mod assets;
pub mod card;
pub mod config;
pub mod delivery;
pub mod documents;
pub mod error;
pub mod fonts;
pub mod layout;
pub mod notify;
pub mod pipeline;
pub mod record;
pub mod render;
pub mod retention;
pub mod samples;
pub mod service;
pub mod store;

// Re-exports for convenience
pub use error::{RenderError, ServiceError};
pub use pipeline::{generate_card, CardRenderer, PdfCardRenderer};
pub use record::{AthleteRecord, DisplayId, NewAthlete};
pub use service::CardService;
