//! Relay line registry.
//!
//! Owns every opened chip and every requested output line for the
//! lifetime of the process.  Lines are requested once at startup in a
//! fixed order (pump first, then each plant in configuration order) and
//! are driven to their inactive level on request, so the rig comes up
//! armed but off.
//!
//! ## Ownership contract
//!
//! The registry is moved into the activation worker after startup; it is
//! the only writer.  Nothing else in the process holds a reference to it,
//! so line state needs no locking.
//!
//! ## Polarity
//!
//! Callers speak logical [`Level`]s.  With `active_low` (the default for
//! opto-isolated relay boards) `Active` drives the line low.

use core::fmt;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use embedded_hal::digital::OutputPin;
use log::{debug, error, info};

use crate::app::ports::GpioPort;
use crate::config::{GpioRef, IrrigationConfig};
use crate::error::{Error, Level, Result};

/// Index of a plant in configuration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlantId(usize);

impl PlantId {
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PlantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "plant #{}", self.0)
    }
}

/// A logical relay the registry can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Pump,
    Valve(PlantId),
}

struct RelayLine<L> {
    label: String,
    gpio: GpioRef,
    pin: L,
}

/// Exclusive owner of all chip and line handles.
pub struct LineRegistry<G: GpioPort> {
    chips: BTreeMap<String, G::Chip>,
    pump: RelayLine<G::Line>,
    valves: Vec<RelayLine<G::Line>>,
    active_low: bool,
}

/// Electrical level for a logical one.
const fn electrical(level: Level, active_low: bool) -> bool {
    matches!(level, Level::Active) != active_low
}

impl<G: GpioPort> LineRegistry<G> {
    /// Open every chip and request every line named by `config`.
    ///
    /// Fails on the first chip or line that cannot be acquired; the error
    /// names the entity (pump or plant) and its address.  Handles acquired
    /// before the failure are dropped with the partial registry.
    pub fn open(gpio: &mut G, config: &IrrigationConfig) -> Result<Self> {
        let mut chips = BTreeMap::new();
        let active_low = config.active_low;

        let pump = Self::request_line(
            gpio,
            &mut chips,
            "pump".to_owned(),
            &config.pump.gpio,
            active_low,
            &config.consumer,
        )?;

        let mut valves = Vec::with_capacity(config.plants.len());
        for plant in &config.plants {
            valves.push(Self::request_line(
                gpio,
                &mut chips,
                format!("plant '{}'", plant.name),
                &plant.gpio,
                active_low,
                &config.consumer,
            )?);
        }

        info!(
            "registry: armed pump + {} valve(s) on {} chip(s), active_{}",
            valves.len(),
            chips.len(),
            if active_low { "low" } else { "high" },
        );

        Ok(Self {
            chips,
            pump,
            valves,
            active_low,
        })
    }

    /// Return the chip handle for `id`, opening it on first use.
    fn open_chip<'c>(
        gpio: &mut G,
        chips: &'c mut BTreeMap<String, G::Chip>,
        id: &str,
    ) -> Result<&'c mut G::Chip> {
        match chips.entry(id.to_owned()) {
            Entry::Occupied(slot) => Ok(slot.into_mut()),
            Entry::Vacant(slot) => {
                let chip = gpio.open_chip(id).map_err(|source| Error::ChipOpen {
                    chip: id.to_owned(),
                    source,
                })?;
                info!("registry: opened chip {id}");
                Ok(slot.insert(chip))
            }
        }
    }

    /// Request `gpio` as an output held at its inactive level.
    fn request_line(
        gpio: &mut G,
        chips: &mut BTreeMap<String, G::Chip>,
        label: String,
        target: &GpioRef,
        active_low: bool,
        consumer: &str,
    ) -> Result<RelayLine<G::Line>> {
        let chip = Self::open_chip(gpio, chips, &target.chip)?;
        let initial = electrical(Level::Inactive, active_low);
        let pin = gpio
            .request_line(chip, target.line, initial, consumer)
            .map_err(|source| Error::LineRequest {
                entity: label.clone(),
                gpio: target.clone(),
                source,
            })?;
        info!("registry: {label} -> {target} (inactive)");
        Ok(RelayLine {
            label,
            gpio: target.clone(),
            pin,
        })
    }

    fn line_mut(&mut self, entity: Entity) -> Result<&mut RelayLine<G::Line>> {
        match entity {
            Entity::Pump => Ok(&mut self.pump),
            Entity::Valve(id) => self
                .valves
                .get_mut(id.index())
                .ok_or(Error::UnknownPlant(id.index())),
        }
    }

    /// Drive `entity` to `level`.
    pub fn set_level(&mut self, entity: Entity, level: Level) -> Result<()> {
        let high = electrical(level, self.active_low);
        let line = self.line_mut(entity)?;
        let written = if high {
            line.pin.set_high()
        } else {
            line.pin.set_low()
        };
        match written {
            Ok(()) => {
                debug!("registry: {} {} -> {level}", line.label, line.gpio);
                Ok(())
            }
            Err(e) => Err(Error::LineWrite {
                entity: line.label.clone(),
                gpio: line.gpio.clone(),
                level,
                detail: format!("{e:?}"),
            }),
        }
    }

    pub fn energize(&mut self, entity: Entity) -> Result<()> {
        self.set_level(entity, Level::Active)
    }

    pub fn deenergize(&mut self, entity: Entity) -> Result<()> {
        self.set_level(entity, Level::Inactive)
    }

    /// De-energize `plant`'s valve, then the pump.
    ///
    /// Both writes are attempted regardless of the other's outcome.  Every
    /// failure is logged; the first one is returned.
    pub fn release(&mut self, plant: PlantId) -> Result<()> {
        let valve = self.deenergize(Entity::Valve(plant));
        let pump = self.deenergize(Entity::Pump);
        for result in [&valve, &pump] {
            if let Err(e) = result {
                error!("registry: release failed: {e}");
            }
        }
        valve.and(pump)
    }

    /// Drive every valve, then the pump, inactive.
    pub fn all_off(&mut self) -> Result<()> {
        let mut first = Ok(());
        for index in 0..self.valves.len() {
            let result = self.deenergize(Entity::Valve(PlantId::new(index)));
            if let Err(e) = result {
                error!("registry: all-off: {e}");
                if first.is_ok() {
                    first = Err(e);
                }
            }
        }
        if let Err(e) = self.deenergize(Entity::Pump) {
            error!("registry: all-off: {e}");
            if first.is_ok() {
                first = Err(e);
            }
        }
        first
    }

    /// Number of configured plants (valve lines).
    pub fn plant_count(&self) -> usize {
        self.valves.len()
    }

    /// Number of distinct chips opened.
    pub fn chip_count(&self) -> usize {
        self.chips.len()
    }

    /// Human-readable label of `entity` (`pump`, `plant 'tomatoes'`).
    pub fn label(&self, entity: Entity) -> Option<&str> {
        match entity {
            Entity::Pump => Some(&self.pump.label),
            Entity::Valve(id) => self.valves.get(id.index()).map(|l| l.label.as_str()),
        }
    }

    /// Physical address of `entity`.
    pub fn address(&self, entity: Entity) -> Option<&GpioRef> {
        match entity {
            Entity::Pump => Some(&self.pump.gpio),
            Entity::Valve(id) => self.valves.get(id.index()).map(|l| &l.gpio),
        }
    }
}
