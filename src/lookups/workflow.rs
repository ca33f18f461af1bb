//! Credit-metered lookup: validate, confirm, fetch, charge, persist.
//!
//! Charging and persisting are two separate writes to the store. When the
//! record cannot be written after the debit succeeded, the user stays
//! charged without a history entry; [`LookupError::Persist`] reports that
//! case together with the balance already committed.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::plate::{InvalidPlate, PlateNumber};
use super::render::{render_fields, DisplayField};
use super::repo::{self, VehicleLookupRecord};
use super::vehicle_api::{VehicleApi, VehicleApiError, VehicleData};
use crate::profiles::{self, UserProfile};
use crate::store::{DocumentStore, StoreError};

/// Credits charged per successful fetch.
pub const LOOKUP_COST: i64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupState {
    Idle,
    Validating,
    AwaitingConfirmation,
    Fetching,
    Charging,
    Persisting,
    Done,
    Error,
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error(transparent)]
    InvalidPlate(#[from] InvalidPlate),

    #[error("Insufficient credits. You need at least {required} credits to perform a lookup.")]
    InsufficientCredits { balance: i64, required: i64 },

    #[error(transparent)]
    Fetch(#[from] VehicleApiError),

    #[error("Failed to charge credits: {0}")]
    Charge(StoreError),

    #[error("Lookup was charged but could not be saved to history: {source}")]
    Persist { source: StoreError, balance: i64 },
}

impl LookupError {
    /// The step that failed.
    pub fn state(&self) -> LookupState {
        match self {
            LookupError::InvalidPlate(_) | LookupError::InsufficientCredits { .. } => LookupState::Validating,
            LookupError::Fetch(_) => LookupState::Fetching,
            LookupError::Charge(_) => LookupState::Charging,
            LookupError::Persist { .. } => LookupState::Persisting,
        }
    }
}

fn ensure_affordable(balance: i64) -> Result<(), LookupError> {
    if balance < LOOKUP_COST {
        return Err(LookupError::InsufficientCredits {
            balance,
            required: LOOKUP_COST,
        });
    }
    Ok(())
}

/// What a lookup will cost; produced without touching anything remote.
#[derive(Debug, Clone, Serialize)]
pub struct LookupQuote {
    pub vehicle_number: PlateNumber,
    pub cost: i64,
    pub balance: i64,
}

impl LookupQuote {
    pub fn confirm(self) -> ConfirmedLookup {
        ConfirmedLookup {
            plate: self.vehicle_number,
        }
    }
}

/// A validated, affordable, user-confirmed lookup. Only obtainable
/// through [`LookupQuote::confirm`].
#[derive(Debug)]
pub struct ConfirmedLookup {
    plate: PlateNumber,
}

pub fn quote(raw: &str, profile: &UserProfile) -> Result<LookupQuote, LookupError> {
    debug!(from = ?LookupState::Idle, state = ?LookupState::Validating, "lookup");
    let vehicle_number = PlateNumber::parse(raw)?;
    ensure_affordable(profile.credits)?;
    debug!(state = ?LookupState::AwaitingConfirmation, %vehicle_number, "lookup");
    Ok(LookupQuote {
        vehicle_number,
        cost: LOOKUP_COST,
        balance: profile.credits,
    })
}

#[derive(Debug, Serialize)]
pub struct LookupOutcome {
    pub vehicle_number: PlateNumber,
    pub vehicle: VehicleData,
    pub fields: Vec<DisplayField>,
    pub record: VehicleLookupRecord,
    pub profile: UserProfile,
}

pub struct LookupWorkflow<'a> {
    store: &'a dyn DocumentStore,
    vehicles: &'a dyn VehicleApi,
}

impl<'a> LookupWorkflow<'a> {
    pub fn new(store: &'a dyn DocumentStore, vehicles: &'a dyn VehicleApi) -> Self {
        Self { store, vehicles }
    }

    /// Runs a confirmed lookup. `profile` tracks the stored balance after
    /// the debit, including when the final persist step fails.
    #[instrument(skip_all, fields(plate = %confirmed.plate, user_id = %profile.user_id))]
    pub async fn run(&self, confirmed: ConfirmedLookup, profile: &mut UserProfile) -> Result<LookupOutcome, LookupError> {
        // The balance may have moved since the quote.
        ensure_affordable(profile.credits)?;

        debug!(state = ?LookupState::Fetching, "lookup");
        let vehicle = self.vehicles.lookup(&confirmed.plate).await?;

        debug!(state = ?LookupState::Charging, balance = profile.credits, "lookup");
        let charged = profiles::repo::set_credits(self.store, &profile.id, profile.credits - LOOKUP_COST)
            .await
            .map_err(LookupError::Charge)?;
        let refreshed = profiles::repo::get(self.store, &profile.id).await;
        *profile = match refreshed {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!(error = %e, "profile refresh after charge failed; using update result");
                charged
            }
        };

        debug!(state = ?LookupState::Persisting, balance = profile.credits, "lookup");
        let record = repo::append(self.store, &profile.user_id, &vehicle)
            .await
            .map_err(|source| {
                warn!(error = %source, balance = profile.credits, "charged lookup not recorded");
                LookupError::Persist {
                    source,
                    balance: profile.credits,
                }
            })?;

        info!(state = ?LookupState::Done, record_id = %record.id, balance = profile.credits, "lookup");
        Ok(LookupOutcome {
            vehicle_number: confirmed.plate,
            fields: render_fields(&vehicle),
            vehicle,
            record,
            profile: profile.clone(),
        })
    }
}
