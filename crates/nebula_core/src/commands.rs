//! Order issuing.
//!
//! The only path by which planners' output reaches a ship. Every operation
//! validates its arguments and, when the target is in another system, queues
//! the `TravelViaJump` legs of the planned route ahead of the action order.
//! A rejected call leaves the ship's orders untouched.

use crate::error::{GameError, Result};
use crate::ids::{Id, INVALID_ID};
use crate::math::Vec2;
use crate::orders::Order;
use crate::simulation::Simulation;

/// Order-issuing operations used by the assignment applier.
///
/// Implemented by [`Simulation`]; tests substitute recording doubles.
pub trait OrderIssuer {
    /// Drop the ship's active queue and repeat settings. Suspended orders are kept.
    ///
    /// # Errors
    /// Returns an error if the ship does not exist.
    fn clear_orders(&mut self, ship_id: Id) -> Result<()>;

    /// Queue the jumps that take the ship to a system.
    fn issue_travel_to_system(
        &mut self,
        ship_id: Id,
        system_id: Id,
        restrict_to_discovered: bool,
        goal_pos_mkm: Option<Vec2>,
    ) -> Result<()>;

    /// Travel to a colony and load minerals. An empty mineral or zero tons means all.
    fn issue_load_mineral(
        &mut self,
        ship_id: Id,
        colony_id: Id,
        mineral: &str,
        tons: f64,
        restrict_to_discovered: bool,
    ) -> Result<()>;

    /// Travel to a colony and unload minerals. An empty mineral or zero tons means all.
    fn issue_unload_mineral(
        &mut self,
        ship_id: Id,
        colony_id: Id,
        mineral: &str,
        tons: f64,
        restrict_to_discovered: bool,
    ) -> Result<()>;

    /// Travel to an owned colony and embark troops.
    fn issue_load_troops(
        &mut self,
        ship_id: Id,
        colony_id: Id,
        strength: f64,
        restrict_to_discovered: bool,
    ) -> Result<()>;

    /// Travel to an owned colony and disembark troops.
    fn issue_unload_troops(
        &mut self,
        ship_id: Id,
        colony_id: Id,
        strength: f64,
        restrict_to_discovered: bool,
    ) -> Result<()>;

    /// Travel to an owned colony and embark colonists.
    fn issue_load_colonists(
        &mut self,
        ship_id: Id,
        colony_id: Id,
        millions: f64,
        restrict_to_discovered: bool,
    ) -> Result<()>;

    /// Travel to an owned colony and disembark colonists.
    fn issue_unload_colonists(
        &mut self,
        ship_id: Id,
        colony_id: Id,
        millions: f64,
        restrict_to_discovered: bool,
    ) -> Result<()>;

    /// Travel to a wreck and salvage it. An empty mineral or zero tons means as much as fits.
    fn issue_salvage_wreck(
        &mut self,
        ship_id: Id,
        wreck_id: Id,
        mineral: &str,
        tons: f64,
        restrict_to_discovered: bool,
    ) -> Result<()>;
}

/// Who may use a colony.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Owner,
    TradePartner,
}

fn check_amount(what: &str, amount: f64) -> Result<()> {
    if amount.is_finite() && amount >= 0.0 {
        Ok(())
    } else {
        Err(GameError::InvalidArgument(format!(
            "{what} must be a non-negative number, got {amount}"
        )))
    }
}

impl Simulation {
    /// System and position of a colony the ship may use.
    fn colony_target(&self, ship_id: Id, colony_id: Id, access: Access) -> Result<(Id, Vec2)> {
        let ship = self.state().ships.get(&ship_id).ok_or(GameError::ShipNotFound(ship_id))?;
        let colony = self
            .state()
            .colonies
            .get(&colony_id)
            .ok_or(GameError::ColonyNotFound(colony_id))?;
        let permitted = match access {
            Access::Owner => colony.faction_id == ship.faction_id,
            Access::TradePartner => {
                self.are_factions_trade_partners(ship.faction_id, colony.faction_id)
            }
        };
        if !permitted {
            return Err(GameError::NotPermitted {
                ship_id,
                ship_faction: ship.faction_id,
                colony_id,
                colony_faction: colony.faction_id,
            });
        }
        let (system_id, pos) = self.state().colony_location(colony_id).ok_or_else(|| {
            GameError::InvalidState(format!("Colony {colony_id} is not placed in a system"))
        })?;
        if !self.state().systems.contains_key(&system_id) {
            return Err(GameError::SystemNotFound(system_id));
        }
        Ok((system_id, pos))
    }

    fn require_colony_berths(&self, ship_id: Id) -> Result<()> {
        let ship = self.state().ships.get(&ship_id).ok_or(GameError::ShipNotFound(ship_id))?;
        match self.find_design(&ship.design_id) {
            Some(d) if d.colony_capacity_millions > 0.0 => Ok(()),
            _ => Err(GameError::InvalidArgument(format!("Ship {ship_id} has no colonist berths"))),
        }
    }

    /// Jumps from the ship's predicted position to a system.
    fn route_jumps(
        &self,
        ship_id: Id,
        system_id: Id,
        restrict_to_discovered: bool,
        goal_pos_mkm: Option<Vec2>,
    ) -> Result<Vec<Id>> {
        if !self.state().ships.contains_key(&ship_id) {
            return Err(GameError::ShipNotFound(ship_id));
        }
        if !self.state().systems.contains_key(&system_id) {
            return Err(GameError::SystemNotFound(system_id));
        }
        let plan = self
            .plan_jump_route_for_ship(ship_id, system_id, restrict_to_discovered, goal_pos_mkm)
            .ok_or(GameError::NoRoute { ship_id, system_id })?;
        Ok(plan.jump_ids)
    }

    /// Queue the route legs and then `order`.
    fn travel_then(
        &mut self,
        ship_id: Id,
        system_id: Id,
        pos: Vec2,
        restrict_to_discovered: bool,
        order: Order,
    ) -> Result<()> {
        let jumps = self.route_jumps(ship_id, system_id, restrict_to_discovered, Some(pos))?;
        let queue = &mut self.state_mut().ship_orders.entry(ship_id).or_default().queue;
        queue.extend(jumps.into_iter().map(|jump_point_id| Order::TravelViaJump { jump_point_id }));
        queue.push(order);
        tracing::trace!(ship_id, system_id, queued = queue.len(), "order queued");
        Ok(())
    }
}

impl OrderIssuer for Simulation {
    fn clear_orders(&mut self, ship_id: Id) -> Result<()> {
        if !self.state().ships.contains_key(&ship_id) {
            return Err(GameError::ShipNotFound(ship_id));
        }
        let orders = self.state_mut().ship_orders.entry(ship_id).or_default();
        orders.queue.clear();
        orders.repeat = false;
        orders.repeat_count_remaining = 0;
        orders.repeat_template.clear();
        Ok(())
    }

    fn issue_travel_to_system(
        &mut self,
        ship_id: Id,
        system_id: Id,
        restrict_to_discovered: bool,
        goal_pos_mkm: Option<Vec2>,
    ) -> Result<()> {
        let jumps = self.route_jumps(ship_id, system_id, restrict_to_discovered, goal_pos_mkm)?;
        if jumps.is_empty() {
            return Ok(());
        }
        let queue = &mut self.state_mut().ship_orders.entry(ship_id).or_default().queue;
        queue.extend(jumps.into_iter().map(|jump_point_id| Order::TravelViaJump { jump_point_id }));
        Ok(())
    }

    fn issue_load_mineral(
        &mut self,
        ship_id: Id,
        colony_id: Id,
        mineral: &str,
        tons: f64,
        restrict_to_discovered: bool,
    ) -> Result<()> {
        check_amount("tons", tons)?;
        let (system_id, pos) = self.colony_target(ship_id, colony_id, Access::TradePartner)?;
        let order = Order::LoadMineral {
            colony_id,
            mineral: mineral.to_string(),
            tons,
        };
        self.travel_then(ship_id, system_id, pos, restrict_to_discovered, order)
    }

    fn issue_unload_mineral(
        &mut self,
        ship_id: Id,
        colony_id: Id,
        mineral: &str,
        tons: f64,
        restrict_to_discovered: bool,
    ) -> Result<()> {
        check_amount("tons", tons)?;
        let (system_id, pos) = self.colony_target(ship_id, colony_id, Access::TradePartner)?;
        let order = Order::UnloadMineral {
            colony_id,
            mineral: mineral.to_string(),
            tons,
        };
        self.travel_then(ship_id, system_id, pos, restrict_to_discovered, order)
    }

    fn issue_load_troops(
        &mut self,
        ship_id: Id,
        colony_id: Id,
        strength: f64,
        restrict_to_discovered: bool,
    ) -> Result<()> {
        check_amount("strength", strength)?;
        let (system_id, pos) = self.colony_target(ship_id, colony_id, Access::Owner)?;
        let order = Order::LoadTroops { colony_id, strength };
        self.travel_then(ship_id, system_id, pos, restrict_to_discovered, order)
    }

    fn issue_unload_troops(
        &mut self,
        ship_id: Id,
        colony_id: Id,
        strength: f64,
        restrict_to_discovered: bool,
    ) -> Result<()> {
        check_amount("strength", strength)?;
        let (system_id, pos) = self.colony_target(ship_id, colony_id, Access::Owner)?;
        let order = Order::UnloadTroops { colony_id, strength };
        self.travel_then(ship_id, system_id, pos, restrict_to_discovered, order)
    }

    fn issue_load_colonists(
        &mut self,
        ship_id: Id,
        colony_id: Id,
        millions: f64,
        restrict_to_discovered: bool,
    ) -> Result<()> {
        check_amount("millions", millions)?;
        let (system_id, pos) = self.colony_target(ship_id, colony_id, Access::Owner)?;
        self.require_colony_berths(ship_id)?;
        let order = Order::LoadColonists { colony_id, millions };
        self.travel_then(ship_id, system_id, pos, restrict_to_discovered, order)
    }

    fn issue_unload_colonists(
        &mut self,
        ship_id: Id,
        colony_id: Id,
        millions: f64,
        restrict_to_discovered: bool,
    ) -> Result<()> {
        check_amount("millions", millions)?;
        let (system_id, pos) = self.colony_target(ship_id, colony_id, Access::Owner)?;
        self.require_colony_berths(ship_id)?;
        let order = Order::UnloadColonists { colony_id, millions };
        self.travel_then(ship_id, system_id, pos, restrict_to_discovered, order)
    }

    fn issue_salvage_wreck(
        &mut self,
        ship_id: Id,
        wreck_id: Id,
        mineral: &str,
        tons: f64,
        restrict_to_discovered: bool,
    ) -> Result<()> {
        check_amount("tons", tons)?;
        if !self.state().ships.contains_key(&ship_id) {
            return Err(GameError::ShipNotFound(ship_id));
        }
        let wreck = self.state().wrecks.get(&wreck_id).ok_or(GameError::WreckNotFound(wreck_id))?;
        let (system_id, pos) = (wreck.system_id, wreck.position_mkm);
        if system_id == INVALID_ID {
            return Err(GameError::InvalidState(format!(
                "Wreck {wreck_id} is not placed in a system"
            )));
        }
        let order = Order::SalvageWreck {
            wreck_id,
            mineral: mineral.to_string(),
            tons,
        };
        self.travel_then(ship_id, system_id, pos, restrict_to_discovered, order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::content::{ContentDb, ShipDesign};
    use crate::orders::ShipOrders;
    use crate::state::{Body, Colony, Faction, GameState, JumpPoint, Ship, StarSystem, Wreck};

    /// Systems 1 and 2 linked by jump 10 <-> 11. Faction 1 owns colony 100 in
    /// system 2; faction 2 owns colony 200 there.
    fn sim() -> Simulation {
        let mut st = GameState::default();
        for id in [1, 2] {
            st.systems.insert(
                id,
                StarSystem {
                    id,
                    ..StarSystem::default()
                },
            );
        }
        st.jump_points.insert(
            10,
            JumpPoint {
                id: 10,
                system_id: 1,
                position_mkm: Vec2::new(5.0, 0.0),
                linked_jump_id: 11,
                ..JumpPoint::default()
            },
        );
        st.jump_points.insert(
            11,
            JumpPoint {
                id: 11,
                system_id: 2,
                linked_jump_id: 10,
                ..JumpPoint::default()
            },
        );
        if let Some(s) = st.systems.get_mut(&1) {
            s.jump_points = vec![10];
        }
        if let Some(s) = st.systems.get_mut(&2) {
            s.jump_points = vec![11];
        }
        st.bodies.insert(
            50,
            Body {
                id: 50,
                system_id: 2,
                position_mkm: Vec2::new(3.0, 4.0),
                ..Body::default()
            },
        );
        st.colonies.insert(
            100,
            Colony {
                id: 100,
                faction_id: 1,
                body_id: 50,
                ..Colony::default()
            },
        );
        st.colonies.insert(
            200,
            Colony {
                id: 200,
                faction_id: 2,
                body_id: 50,
                ..Colony::default()
            },
        );
        st.factions.insert(
            1,
            Faction {
                id: 1,
                ..Faction::default()
            },
        );
        st.ships.insert(
            7,
            Ship {
                id: 7,
                faction_id: 1,
                system_id: 1,
                speed_km_s: 100.0,
                design_id: "liner".into(),
                ..Ship::default()
            },
        );
        st.wrecks.insert(
            30,
            Wreck {
                id: 30,
                system_id: 1,
                ..Wreck::default()
            },
        );
        let mut content = ContentDb::default();
        content.add_design(ShipDesign {
            id: "liner".into(),
            colony_capacity_millions: 10.0,
            ..ShipDesign::default()
        });
        Simulation::new(st, SimConfig::default(), content)
    }

    fn queue(sim: &Simulation) -> Vec<Order> {
        sim.state()
            .ship_orders
            .get(&7)
            .map(|o| o.queue.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_load_inserts_route_legs_before_action() {
        let mut sim = sim();
        sim.issue_load_troops(7, 100, 5.0, false).unwrap();
        assert_eq!(
            queue(&sim),
            vec![
                Order::TravelViaJump { jump_point_id: 10 },
                Order::LoadTroops {
                    colony_id: 100,
                    strength: 5.0
                },
            ]
        );
        // Second leg starts from the predicted position in system 2.
        sim.issue_unload_colonists(7, 100, 2.0, false).unwrap();
        assert_eq!(queue(&sim).len(), 3);
    }

    #[test]
    fn test_rejections_leave_queue_untouched() {
        let mut sim = sim();
        assert!(matches!(
            sim.issue_load_troops(7, 200, 5.0, false),
            Err(GameError::NotPermitted { .. })
        ));
        assert!(matches!(
            sim.issue_unload_mineral(7, 100, "", -1.0, false),
            Err(GameError::InvalidArgument(_))
        ));
        assert!(matches!(
            sim.issue_load_troops(99, 100, 1.0, false),
            Err(GameError::ShipNotFound(99))
        ));
        // System 2 undiscovered by faction 1.
        assert!(matches!(
            sim.issue_load_troops(7, 100, 1.0, true),
            Err(GameError::NoRoute { .. })
        ));
        assert!(queue(&sim).is_empty());
    }

    #[test]
    fn test_salvage_in_same_system_needs_no_jumps() {
        let mut sim = sim();
        sim.issue_salvage_wreck(7, 30, "", 0.0, true).unwrap();
        assert_eq!(
            queue(&sim),
            vec![Order::SalvageWreck {
                wreck_id: 30,
                mineral: String::new(),
                tons: 0.0
            }]
        );
        assert!(matches!(
            sim.issue_salvage_wreck(7, 31, "", 0.0, true),
            Err(GameError::WreckNotFound(31))
        ));
    }

    #[test]
    fn test_clear_orders_keeps_suspended_tier() {
        let mut sim = sim();
        sim.state_mut().ship_orders.insert(
            7,
            ShipOrders {
                queue: vec![Order::WaitDays { days: 3 }],
                repeat: true,
                repeat_count_remaining: 2,
                suspended: true,
                suspended_queue: vec![Order::WaitDays { days: 1 }],
                ..ShipOrders::default()
            },
        );
        sim.clear_orders(7).unwrap();
        let so = &sim.state().ship_orders[&7];
        assert!(so.queue.is_empty() && !so.repeat);
        assert_eq!(so.suspended_queue.len(), 1);
        assert!(sim.clear_orders(8).is_err());
    }
}
