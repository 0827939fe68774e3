use pn2gw_core::{BridgeError, Conversion, Result};
use pn2gw_types::{ConvertRequest, SkippedHandInfo};
use std::sync::Arc;

use crate::loader::{GuestInstance, ModuleLoader};

/// Runs conversions against a loaded guest.
///
/// The error sentinel is resolved here: callers get `Ok(Conversion)` or
/// `Err(BridgeError::Conversion { message })` and never see the raw record.
#[derive(Clone)]
pub struct ConversionInvoker {
    loader: Arc<ModuleLoader>,
}

impl ConversionInvoker {
    pub fn new(loader: Arc<ModuleLoader>) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &Arc<ModuleLoader> {
        &self.loader
    }

    /// Convert one CSV log. Rejected with `NotReady` until the loader is
    /// ready; failures leave the loader usable for the next call.
    pub fn convert(&self, request: &ConvertRequest) -> Result<Conversion> {
        if !self.loader.is_ready() {
            return Err(BridgeError::NotReady);
        }

        self.loader.with_guest(|guest| invoke(guest, request))
    }
}

fn invoke(guest: &mut GuestInstance, request: &ConvertRequest) -> Result<Conversion> {
    let GuestInstance {
        store,
        bridge,
        parse,
    } = guest;

    let csv = bridge.write_string(store, &request.csv_text)?;
    let hero = bridge.write_string(store, &request.hero_name)?;
    let (rake_percent, rake_cap_bb) = request.rake_words();

    tracing::debug!(
        csv_len = csv.length,
        hero_len = hero.length,
        filter_flags = request.filters.bits(),
        game_type = %request.game_type,
        rake_percent,
        rake_cap_bb,
        "Calling parseCSV"
    );

    let record_ptr = parse
        .call(
            &mut *store,
            (
                csv.pointer,
                csv.length,
                hero.pointer,
                hero.length,
                request.filters.bits(),
                request.game_type.as_u32(),
                rake_percent,
                rake_cap_bb,
            ),
        )
        .map_err(|e| BridgeError::Guest(format!("parseCSV trapped: {:#}", e)))?;

    let record = bridge.read_record(store, record_ptr)?;
    let text = bridge.read_string(store, record.result())?;

    if record.is_error() {
        tracing::warn!(message = %text, "Guest rejected conversion");
        return Err(BridgeError::Conversion { message: text });
    }

    let skipped_hands = match record.skipped_detail() {
        Some(detail) => {
            let json = bridge.read_string(store, detail)?;
            match SkippedHandInfo::parse_list(&json) {
                Ok(infos) => Some(infos),
                Err(e) => {
                    tracing::warn!("Failed to parse skipped hands info: {}", e);
                    None
                }
            }
        }
        None => None,
    };

    tracing::info!(
        output_len = text.len(),
        skipped = record.skipped_count,
        "Conversion finished"
    );

    Ok(Conversion {
        hand_history: text,
        skipped_count: record.skipped_count,
        skipped_hands,
    })
}
