//! Ship order queues.
//!
//! Orders are plain data. The planning core never executes them; it reads
//! existing queues (idleness, salvage reservations) and appends new orders
//! through the [`OrderIssuer`](crate::commands::OrderIssuer) surface.

use serde::{Deserialize, Serialize};

use crate::ids::Id;

/// A single queued ship order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Order {
    /// Fly to a jump point and transit it.
    TravelViaJump {
        /// Jump point to use.
        jump_point_id: Id,
    },
    /// Load minerals from a colony. Empty mineral or zero tons means "all".
    LoadMineral {
        /// Source colony.
        colony_id: Id,
        /// Mineral name.
        mineral: String,
        /// Tons to load.
        tons: f64,
    },
    /// Unload minerals at a colony. Empty mineral or zero tons means "all".
    UnloadMineral {
        /// Destination colony.
        colony_id: Id,
        /// Mineral name.
        mineral: String,
        /// Tons to unload.
        tons: f64,
    },
    /// Embark troops from a colony garrison.
    LoadTroops {
        /// Source colony.
        colony_id: Id,
        /// Strength to embark.
        strength: f64,
    },
    /// Disembark troops into a colony garrison.
    UnloadTroops {
        /// Destination colony.
        colony_id: Id,
        /// Strength to disembark.
        strength: f64,
    },
    /// Embark colonists.
    LoadColonists {
        /// Source colony.
        colony_id: Id,
        /// Population to embark (millions).
        millions: f64,
    },
    /// Disembark colonists.
    UnloadColonists {
        /// Destination colony.
        colony_id: Id,
        /// Population to disembark (millions).
        millions: f64,
    },
    /// Salvage minerals from a wreck.
    SalvageWreck {
        /// Wreck to salvage.
        wreck_id: Id,
        /// Mineral name, empty for all.
        mineral: String,
        /// Tons, zero for as much as fits.
        tons: f64,
    },
    /// Repeatedly salvage a wreck and haul the load to a colony.
    SalvageWreckLoop {
        /// Wreck to salvage.
        wreck_id: Id,
        /// Drop-off colony.
        dropoff_colony_id: Id,
        /// Route only through discovered systems.
        restrict_to_discovered: bool,
    },
    /// Wait in place.
    WaitDays {
        /// Days to wait.
        days: u32,
    },
}

impl Order {
    /// Wreck targeted by this order, if it is a salvage order.
    #[must_use]
    pub fn salvage_wreck_id(&self) -> Option<Id> {
        match self {
            Self::SalvageWreck { wreck_id, .. } | Self::SalvageWreckLoop { wreck_id, .. } => {
                Some(*wreck_id)
            }
            _ => None,
        }
    }
}

/// Order state for one ship.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipOrders {
    /// Active queue, front first.
    pub queue: Vec<Order>,
    /// Refill the queue from `repeat_template` when it empties.
    pub repeat: bool,
    /// Remaining refills; negative means unlimited.
    pub repeat_count_remaining: i32,
    /// Template used for repeats.
    pub repeat_template: Vec<Order>,
    /// Orders were set aside (e.g. by an emergency retreat).
    pub suspended: bool,
    /// Queue saved when suspended.
    pub suspended_queue: Vec<Order>,
    /// Repeat flag saved when suspended.
    pub suspended_repeat: bool,
    /// Repeat count saved when suspended.
    pub suspended_repeat_count_remaining: i32,
    /// Repeat template saved when suspended.
    pub suspended_repeat_template: Vec<Order>,
}

impl ShipOrders {
    /// No pending work: empty queue, or a repeat cycle that has run out.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() || (self.repeat && self.repeat_count_remaining == 0)
    }

    /// Every wreck referenced by a salvage order in any live tier.
    ///
    /// Tiers scanned: the queue, the repeat template while repeating, the
    /// suspended queue while suspended, and the suspended repeat template
    /// while it would be restored as a repeat.
    pub fn salvage_targets(&self) -> impl Iterator<Item = Id> + '_ {
        let repeat: &[Order] = if self.repeat {
            &self.repeat_template
        } else {
            &[]
        };
        let suspended: &[Order] = if self.suspended {
            &self.suspended_queue
        } else {
            &[]
        };
        let suspended_repeat: &[Order] = if self.suspended && self.suspended_repeat {
            &self.suspended_repeat_template
        } else {
            &[]
        };
        self.queue
            .iter()
            .chain(repeat)
            .chain(suspended)
            .chain(suspended_repeat)
            .filter_map(Order::salvage_wreck_id)
    }
}

/// Whether a ship with the given order state counts as idle.
#[must_use]
pub fn is_idle(orders: Option<&ShipOrders>) -> bool {
    orders.map_or(true, ShipOrders::is_idle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn salvage(wreck_id: Id) -> Order {
        Order::SalvageWreck {
            wreck_id,
            mineral: String::new(),
            tons: 0.0,
        }
    }

    #[test]
    fn test_idle_rules() {
        assert!(is_idle(None));
        let mut so = ShipOrders::default();
        assert!(so.is_idle());

        so.queue.push(Order::WaitDays { days: 1 });
        assert!(!so.is_idle());

        so.repeat = true;
        so.repeat_count_remaining = 0;
        assert!(so.is_idle());

        so.repeat_count_remaining = -1;
        assert!(!so.is_idle());
    }

    #[test]
    fn test_only_salvage_orders_name_wrecks() {
        let others = [
            Order::TravelViaJump { jump_point_id: 3 },
            Order::LoadMineral {
                colony_id: 3,
                mineral: String::new(),
                tons: 0.0,
            },
            Order::UnloadMineral {
                colony_id: 3,
                mineral: "Duranium".into(),
                tons: 5.0,
            },
            Order::LoadTroops {
                colony_id: 3,
                strength: 1.0,
            },
            Order::UnloadTroops {
                colony_id: 3,
                strength: 1.0,
            },
            Order::LoadColonists {
                colony_id: 3,
                millions: 1.0,
            },
            Order::UnloadColonists {
                colony_id: 3,
                millions: 1.0,
            },
            Order::WaitDays { days: 3 },
        ];
        assert!(others.iter().all(|o| o.salvage_wreck_id().is_none()));
        assert_eq!(salvage(3).salvage_wreck_id(), Some(3));
        let looped = Order::SalvageWreckLoop {
            wreck_id: 4,
            dropoff_colony_id: 3,
            restrict_to_discovered: false,
        };
        assert_eq!(looped.salvage_wreck_id(), Some(4));
    }

    #[test]
    fn test_salvage_targets_respect_tier_flags() {
        let so = ShipOrders {
            queue: vec![salvage(1)],
            repeat: false,
            repeat_template: vec![salvage(2)],
            suspended: true,
            suspended_queue: vec![Order::SalvageWreckLoop {
                wreck_id: 3,
                dropoff_colony_id: 10,
                restrict_to_discovered: true,
            }],
            suspended_repeat: true,
            suspended_repeat_template: vec![salvage(4)],
            ..ShipOrders::default()
        };
        let mut ids: Vec<Id> = so.salvage_targets().collect();
        ids.sort_unstable();
        // Repeat template is dormant because `repeat` is false.
        assert_eq!(ids, vec![1, 3, 4]);
    }
}
