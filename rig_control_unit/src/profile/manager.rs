//! Profile table manager.
//!
//! Holds up to eight per-car-type tuning entries, tracks the active
//! selection, and persists the whole table as one blob through the injected
//! storage. Storage corruption falls back to built-in defaults with car
//! type 0 valid — boot never fails on a bad blob.

use rig_common::fault::ProfileFlags;
use rig_common::profile::{DEFAULT_CAR_TYPE, MAX_CAR_TYPES, ProfileParams};
use tracing::warn;

use super::blob::{self, BLOB_LEN, BlobEntry, ProfileBlob};
use super::storage::ProfileStorage;

/// One tuning table slot.
#[derive(Debug, Clone, Copy)]
pub struct ProfileEntry {
    pub valid: bool,
    pub car_type: u8,
    pub params: ProfileParams,
}

/// Tuning store with persistence.
#[derive(Debug)]
pub struct ProfileManager<S: ProfileStorage> {
    storage: S,
    entries: [ProfileEntry; MAX_CAR_TYPES],
    active_car_type: u8,
    active_params: ProfileParams,
    storage_loaded: bool,
}

impl<S: ProfileStorage> ProfileManager<S> {
    /// Create the manager and attempt to load the persisted table.
    pub fn new(storage: S) -> Self {
        let mut manager = Self {
            storage,
            entries: Self::default_entries(),
            active_car_type: DEFAULT_CAR_TYPE,
            active_params: ProfileParams::default(),
            storage_loaded: false,
        };
        manager.storage_loaded = manager.load();
        manager
    }

    fn default_entries() -> [ProfileEntry; MAX_CAR_TYPES] {
        let mut entries = [ProfileEntry {
            valid: false,
            car_type: 0,
            params: ProfileParams::default(),
        }; MAX_CAR_TYPES];
        for (i, entry) in entries.iter_mut().enumerate() {
            entry.car_type = i as u8;
        }
        entries[DEFAULT_CAR_TYPE as usize].valid = true;
        entries
    }

    fn reset_to_defaults(&mut self) {
        self.entries = Self::default_entries();
        self.active_car_type = DEFAULT_CAR_TYPE;
        self.active_params = ProfileParams::default();
    }

    // ── Operations ──────────────────────────────────────────────────

    /// Store clamped tuning for a car type and mark the entry valid.
    /// Refreshes the cached active params when that car type is active.
    pub fn set_tuning(&mut self, car_type: u8, force_intensity: f32, motion_range: f32) -> bool {
        if !valid_car_type(car_type) {
            return false;
        }
        let entry = &mut self.entries[car_type as usize];
        entry.valid = true;
        entry.car_type = car_type;
        entry.params = ProfileParams {
            force_intensity,
            motion_range,
        }
        .clamped();

        if self.active_car_type == car_type {
            self.active_params = entry.params;
        }
        true
    }

    /// Make the given car type active, defaulting its entry if unset.
    pub fn switch_active(&mut self, car_type: u8) -> bool {
        if !valid_car_type(car_type) {
            return false;
        }
        let entry = &mut self.entries[car_type as usize];
        if !entry.valid {
            entry.valid = true;
            entry.car_type = car_type;
            entry.params = ProfileParams::default();
        }
        self.active_car_type = car_type;
        self.active_params = entry.params;
        true
    }

    /// Ensure the entry exists, then persist the whole table.
    pub fn save(&mut self, car_type: u8) -> bool {
        if !valid_car_type(car_type) {
            return false;
        }
        let entry = &mut self.entries[car_type as usize];
        if !entry.valid {
            entry.valid = true;
            entry.car_type = car_type;
            entry.params = ProfileParams::default();
        }
        self.persist()
    }

    /// Write the table to storage.
    pub fn persist(&mut self) -> bool {
        let mut entries = [BlobEntry {
            valid: false,
            car_type: 0,
            params: ProfileParams::default(),
        }; MAX_CAR_TYPES];
        for (dst, src) in entries.iter_mut().zip(self.entries.iter()) {
            *dst = BlobEntry {
                valid: src.valid,
                car_type: src.car_type,
                params: src.params,
            };
        }
        let bytes = blob::encode(&ProfileBlob {
            active_car_type: self.active_car_type,
            entries,
        });
        self.storage.write(&bytes)
    }

    /// Reload the table from storage. On any failure the table falls back
    /// to defaults and `false` is returned.
    pub fn load(&mut self) -> bool {
        let mut bytes = [0u8; BLOB_LEN];
        if !self.storage.read(&mut bytes) {
            self.reset_to_defaults();
            return false;
        }
        let Some(decoded) = blob::decode(&bytes) else {
            warn!("profile blob rejected, using defaults");
            self.reset_to_defaults();
            return false;
        };

        self.reset_to_defaults();
        for src in decoded.entries.iter() {
            if !valid_car_type(src.car_type) {
                continue;
            }
            let dst = &mut self.entries[src.car_type as usize];
            dst.valid = src.valid;
            dst.car_type = src.car_type;
            dst.params = src.params.clamped();
        }

        self.active_car_type = if valid_car_type(decoded.active_car_type) {
            decoded.active_car_type
        } else {
            DEFAULT_CAR_TYPE
        };
        let active = &mut self.entries[self.active_car_type as usize];
        if !active.valid {
            active.valid = true;
            active.params = ProfileParams::default();
        }
        self.active_params = active.params;
        true
    }

    // ── Accessors ───────────────────────────────────────────────────

    /// Parameters for a specific car type; `None` when unset.
    pub fn get_params(&self, car_type: u8) -> Option<ProfileParams> {
        if !valid_car_type(car_type) {
            return None;
        }
        let entry = &self.entries[car_type as usize];
        entry.valid.then_some(entry.params)
    }

    /// Cached parameters of the active car type.
    #[inline]
    pub const fn active_params(&self) -> ProfileParams {
        self.active_params
    }

    #[inline]
    pub const fn active_car_type(&self) -> u8 {
        self.active_car_type
    }

    /// Whether the active entry is valid.
    pub fn active_valid(&self) -> bool {
        self.entries[self.active_car_type as usize].valid
    }

    /// Whether the boot-time load succeeded.
    #[inline]
    pub const fn storage_loaded(&self) -> bool {
        self.storage_loaded
    }

    /// Flag bitmask for status telemetry.
    pub fn flags(&self) -> ProfileFlags {
        let mut flags = ProfileFlags::empty();
        if self.storage_loaded {
            flags |= ProfileFlags::STORAGE_LOADED;
        }
        if self.active_valid() {
            flags |= ProfileFlags::ACTIVE_VALID;
        }
        flags
    }
}

#[inline]
fn valid_car_type(car_type: u8) -> bool {
    (car_type as usize) < MAX_CAR_TYPES
}
