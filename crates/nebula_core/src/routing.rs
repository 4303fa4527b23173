//! Jump-network route oracle.
//!
//! Dijkstra over `(system, entry jump)` nodes. The cost of a leg is the
//! in-system distance from where the ship stands (the start position or the
//! jump point it arrived through) to the exit jump point. Heap order is fully
//! specified, so equal-cost routes always resolve to the same plan.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::ids::{Id, INVALID_ID};
use crate::math::{mkm_per_day, Vec2, EPS};
use crate::orders::Order;
use crate::state::GameState;

/// A planned route through the jump network.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JumpRoutePlan {
    /// Systems visited, start first.
    pub systems: Vec<Id>,
    /// Jump points transited, in order.
    pub jump_ids: Vec<Id>,
    /// In-system distance flown to reach the last jump (mkm).
    pub distance_mkm: f64,
    /// Distance from the arrival point to the goal position (mkm).
    pub final_leg_mkm: f64,
    /// `distance_mkm + final_leg_mkm`.
    pub total_distance_mkm: f64,
    /// Days to arrive in the goal system.
    pub eta_days: f64,
    /// Days to reach the goal position. Travel only.
    pub total_eta_days: f64,
    /// Where the ship appears in the goal system.
    pub arrival_pos_mkm: Vec2,
}

/// Parameters of a route query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteQuery {
    /// Start system.
    pub start_system_id: Id,
    /// Start position in the start system.
    pub start_pos_mkm: Vec2,
    /// Faction whose discovered map applies.
    pub faction_id: Id,
    /// Travel speed.
    pub speed_km_s: f64,
    /// Goal system.
    pub goal_system_id: Id,
    /// Only traverse systems the faction has discovered.
    pub restrict_to_discovered: bool,
    /// Optional goal position inside the goal system.
    pub goal_pos_mkm: Option<Vec2>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RouteNode {
    system_id: Id,
    entry_jump_id: Id,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct RouteDist {
    cost_mkm: f64,
    hops: u32,
}

impl RouteDist {
    fn better_than(self, other: Self) -> bool {
        self.cost_mkm + EPS < other.cost_mkm
            || ((self.cost_mkm - other.cost_mkm).abs() <= EPS && self.hops < other.hops)
    }
}

/// Heap entry ordered so the max-heap pops the cheapest node first.
#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    dist: RouteDist,
    node: RouteNode,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed on every key: lower cost, hops, system, entry pop first.
        other
            .dist
            .cost_mkm
            .total_cmp(&self.dist.cost_mkm)
            .then_with(|| other.dist.hops.cmp(&self.dist.hops))
            .then_with(|| other.node.system_id.cmp(&self.node.system_id))
            .then_with(|| other.node.entry_jump_id.cmp(&self.node.entry_jump_id))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn finish_plan(
    mut plan: JumpRoutePlan,
    goal: Option<Vec2>,
    speed_km_s: f64,
    seconds_per_day: f64,
) -> JumpRoutePlan {
    if let Some(goal) = goal {
        plan.final_leg_mkm = plan.arrival_pos_mkm.distance(goal);
    }
    plan.total_distance_mkm = plan.distance_mkm + plan.final_leg_mkm;
    let rate = mkm_per_day(speed_km_s, seconds_per_day);
    if rate > 0.0 {
        plan.eta_days = plan.distance_mkm / rate;
        plan.total_eta_days = plan.total_distance_mkm / rate;
    } else {
        plan.eta_days = f64::INFINITY;
        plan.total_eta_days = f64::INFINITY;
    }
    plan
}

/// Plan a route through the jump network.
///
/// Returns `None` when the speed is not positive, either system is missing,
/// or the goal is unreachable under the discovery restriction. The start
/// system is always traversable. A faction that does not exist does not
/// restrict routing.
#[must_use]
pub fn plan_jump_route(
    state: &GameState,
    cfg: &SimConfig,
    query: &RouteQuery,
) -> Option<JumpRoutePlan> {
    if query.speed_km_s.is_nan() || query.speed_km_s <= 0.0 || !query.start_pos_mkm.is_finite() {
        return None;
    }
    if !state.systems.contains_key(&query.start_system_id)
        || !state.systems.contains_key(&query.goal_system_id)
    {
        return None;
    }

    let faction = if query.restrict_to_discovered {
        state.factions.get(&query.faction_id)
    } else {
        None
    };
    let allow_system = |sys: Id| {
        faction.map_or(true, |f| {
            sys == query.start_system_id || f.discovered_systems.contains(&sys)
        })
    };
    if !allow_system(query.goal_system_id) {
        return None;
    }

    let goal = query.goal_pos_mkm.filter(|g| g.is_finite());

    if query.start_system_id == query.goal_system_id {
        let plan = JumpRoutePlan {
            systems: vec![query.start_system_id],
            arrival_pos_mkm: query.start_pos_mkm,
            ..JumpRoutePlan::default()
        };
        return Some(finish_plan(plan, goal, query.speed_km_s, cfg.seconds_per_day));
    }

    let start = RouteNode {
        system_id: query.start_system_id,
        entry_jump_id: INVALID_ID,
    };
    let mut heap = BinaryHeap::new();
    let mut dist: HashMap<RouteNode, RouteDist> = HashMap::new();
    let mut prev: HashMap<RouteNode, (RouteNode, Id)> = HashMap::new();

    let zero = RouteDist {
        cost_mkm: 0.0,
        hops: 0,
    };
    dist.insert(start, zero);
    heap.push(HeapEntry {
        dist: zero,
        node: start,
    });

    let mut best: Option<(RouteNode, RouteDist, f64)> = None;

    while let Some(HeapEntry { dist: d, node }) = heap.pop() {
        match dist.get(&node) {
            Some(known) if known.better_than(d) => continue,
            None => continue,
            _ => {}
        }
        if let Some((_, _, best_total)) = best {
            if goal.is_some() && d.cost_mkm > best_total + EPS {
                break;
            }
        }

        let Some(system) = state.systems.get(&node.system_id) else {
            continue;
        };
        let here = if node.entry_jump_id == INVALID_ID {
            query.start_pos_mkm
        } else {
            match state.jump_points.get(&node.entry_jump_id) {
                Some(jp) if jp.system_id == node.system_id => jp.position_mkm,
                _ => continue,
            }
        };

        if node.system_id == query.goal_system_id {
            let terminal = goal.map_or(0.0, |g| here.distance(g));
            let total = d.cost_mkm + terminal;
            let improves = match best {
                None => true,
                Some((best_node, best_dist, best_total)) => {
                    if total + EPS < best_total {
                        true
                    } else if (total - best_total).abs() <= EPS {
                        d.hops < best_dist.hops
                            || (d.hops == best_dist.hops
                                && (d.cost_mkm + EPS < best_dist.cost_mkm
                                    || ((d.cost_mkm - best_dist.cost_mkm).abs() <= EPS
                                        && node.entry_jump_id < best_node.entry_jump_id)))
                    } else {
                        false
                    }
                }
            };
            if improves {
                best = Some((node, d, total));
            }
            if goal.is_none() {
                break;
            }
        }

        let mut outgoing = system.jump_points.clone();
        outgoing.sort_unstable();
        outgoing.dedup();
        for jump_id in outgoing {
            let Some(jp) = state.jump_points.get(&jump_id) else {
                continue;
            };
            if jp.system_id != node.system_id || jp.linked_jump_id == INVALID_ID {
                continue;
            }
            let Some(far) = state.jump_points.get(&jp.linked_jump_id) else {
                continue;
            };
            if far.system_id == INVALID_ID || !state.systems.contains_key(&far.system_id) {
                continue;
            }
            if !allow_system(far.system_id) {
                continue;
            }

            let next = RouteNode {
                system_id: far.system_id,
                entry_jump_id: far.id,
            };
            let cand = RouteDist {
                cost_mkm: d.cost_mkm + here.distance(jp.position_mkm),
                hops: d.hops + 1,
            };
            let replace = dist.get(&next).map_or(true, |known| cand.better_than(*known));
            if replace {
                dist.insert(next, cand);
                prev.insert(next, (node, jump_id));
                heap.push(HeapEntry {
                    dist: cand,
                    node: next,
                });
            }
        }
    }

    let (goal_node, goal_dist, _) = best?;

    let mut jump_ids = Vec::new();
    let mut cur = goal_node;
    while cur != start {
        let (p, jump_id) = *prev.get(&cur)?;
        jump_ids.push(jump_id);
        cur = p;
    }
    jump_ids.reverse();

    let mut systems = Vec::with_capacity(jump_ids.len() + 1);
    systems.push(query.start_system_id);
    for jump_id in &jump_ids {
        let jp = state.jump_points.get(jump_id)?;
        let far = state.jump_points.get(&jp.linked_jump_id)?;
        systems.push(far.system_id);
    }

    let arrival_pos_mkm = state
        .jump_points
        .get(&goal_node.entry_jump_id)
        .filter(|jp| jp.system_id == query.goal_system_id)
        .map_or(query.start_pos_mkm, |jp| jp.position_mkm);

    let plan = JumpRoutePlan {
        systems,
        jump_ids,
        distance_mkm: goal_dist.cost_mkm,
        arrival_pos_mkm,
        ..JumpRoutePlan::default()
    };
    Some(finish_plan(plan, goal, query.speed_km_s, cfg.seconds_per_day))
}

/// System and position a ship will occupy once its queued jumps complete.
///
/// Walks the active queue and follows each `TravelViaJump` whose jump point
/// lies in the current predicted system. Stops at the first jump that does
/// not. `None` when the ship is missing or not in a system.
#[must_use]
pub fn predicted_nav_state(state: &GameState, ship_id: Id) -> Option<(Id, Vec2)> {
    let ship = state.ships.get(&ship_id)?;
    if ship.system_id == INVALID_ID {
        return None;
    }
    let mut system_id = ship.system_id;
    let mut pos = ship.position_mkm;
    if let Some(orders) = state.ship_orders.get(&ship_id) {
        for order in &orders.queue {
            let Order::TravelViaJump { jump_point_id } = order else {
                continue;
            };
            let Some(jp) = state.jump_points.get(jump_point_id) else {
                break;
            };
            if jp.system_id != system_id {
                break;
            }
            let Some(far) = state.jump_points.get(&jp.linked_jump_id) else {
                break;
            };
            system_id = far.system_id;
            pos = far.position_mkm;
        }
    }
    Some((system_id, pos))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentDb;
    use crate::orders::ShipOrders;
    use crate::simulation::Simulation;
    use crate::state::{Faction, JumpPoint, Ship, StarSystem};

    /// Three systems in a line: 1 <-> 2 <-> 3, plus a long bypass 1 <-> 3.
    fn line_state() -> GameState {
        let mut st = GameState::default();
        for id in 1..=3 {
            st.systems.insert(
                id,
                StarSystem {
                    id,
                    ..StarSystem::default()
                },
            );
        }
        let mut link = |a: Id, sa: Id, pa: Vec2, b: Id, sb: Id, pb: Vec2| {
            st.jump_points.insert(
                a,
                JumpPoint {
                    id: a,
                    system_id: sa,
                    position_mkm: pa,
                    linked_jump_id: b,
                    ..JumpPoint::default()
                },
            );
            st.jump_points.insert(
                b,
                JumpPoint {
                    id: b,
                    system_id: sb,
                    position_mkm: pb,
                    linked_jump_id: a,
                    ..JumpPoint::default()
                },
            );
        };
        link(10, 1, Vec2::new(10.0, 0.0), 11, 2, Vec2::new(0.0, 0.0));
        link(12, 2, Vec2::new(10.0, 0.0), 13, 3, Vec2::new(0.0, 0.0));
        link(14, 1, Vec2::new(-100.0, 0.0), 15, 3, Vec2::new(300.0, 0.0));
        for (sys, jumps) in [(1, vec![10, 14]), (2, vec![11, 12]), (3, vec![13, 15])] {
            if let Some(s) = st.systems.get_mut(&sys) {
                s.jump_points = jumps;
            }
        }
        st
    }

    fn query(goal: Id, restrict: bool) -> RouteQuery {
        RouteQuery {
            start_system_id: 1,
            start_pos_mkm: Vec2::ZERO,
            faction_id: 7,
            speed_km_s: 1000.0,
            goal_system_id: goal,
            restrict_to_discovered: restrict,
            goal_pos_mkm: None,
        }
    }

    #[test]
    fn test_route_prefers_cheaper_chain() {
        let st = line_state();
        let cfg = SimConfig::default();
        let plan = plan_jump_route(&st, &cfg, &query(3, false)).unwrap();
        assert_eq!(plan.systems, vec![1, 2, 3]);
        assert_eq!(plan.jump_ids, vec![10, 12]);
        assert!((plan.distance_mkm - 20.0).abs() < 1e-9);
        assert_eq!(plan.arrival_pos_mkm, Vec2::ZERO);
        assert!((plan.eta_days - 20.0 / 86.4).abs() < 1e-9);
    }

    #[test]
    fn test_goal_position_can_favour_other_entry() {
        let st = line_state();
        let cfg = SimConfig::default();
        // Goal sits on the bypass exit; the short chain arrives 300 mkm away.
        let mut q = query(3, false);
        q.goal_pos_mkm = Some(Vec2::new(300.0, 0.0));
        let plan = plan_jump_route(&st, &cfg, &q).unwrap();
        assert_eq!(plan.jump_ids, vec![14]);
        assert_eq!(plan.final_leg_mkm, 0.0);
        assert!((plan.total_distance_mkm - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_discovery_restriction_blocks_unknown_systems() {
        let mut st = line_state();
        let mut f = Faction {
            id: 7,
            ..Faction::default()
        };
        f.discovered_systems.insert(3);
        st.factions.insert(7, f);
        let cfg = SimConfig::default();

        // System 2 is unknown, so only the bypass remains.
        let plan = plan_jump_route(&st, &cfg, &query(3, true)).unwrap();
        assert_eq!(plan.jump_ids, vec![14]);
        // Goal itself undiscovered.
        assert!(plan_jump_route(&st, &cfg, &query(2, true)).is_none());
        // Unrestricted routing ignores discovery.
        assert!(plan_jump_route(&st, &cfg, &query(2, false)).is_some());
    }

    #[test]
    fn test_unknown_faction_routes_unrestricted() {
        let st = line_state();
        let cfg = SimConfig::default();
        let sim = Simulation::new(st.clone(), cfg.clone(), ContentDb::default());
        assert!(!st.factions.contains_key(&7));
        assert!(sim.is_system_discovered_by_faction(7, 2));

        let plan = plan_jump_route(&st, &cfg, &query(3, true)).unwrap();
        assert_eq!(plan.jump_ids, vec![10, 12]);
        assert!(plan_jump_route(&st, &cfg, &query(2, true)).is_some());
    }

    #[test]
    fn test_zero_speed_or_missing_system_is_unreachable() {
        let st = line_state();
        let cfg = SimConfig::default();
        let mut q = query(3, false);
        q.speed_km_s = 0.0;
        assert!(plan_jump_route(&st, &cfg, &q).is_none());
        assert!(plan_jump_route(&st, &cfg, &query(99, false)).is_none());
    }

    #[test]
    fn test_same_system_uses_final_leg_only() {
        let st = line_state();
        let cfg = SimConfig::default();
        let mut q = query(1, false);
        q.goal_pos_mkm = Some(Vec2::new(86.4, 0.0));
        let plan = plan_jump_route(&st, &cfg, &q).unwrap();
        assert!(plan.jump_ids.is_empty());
        assert_eq!(plan.eta_days, 0.0);
        assert!((plan.total_eta_days - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_predicted_nav_follows_queued_jumps() {
        let mut st = line_state();
        st.ships.insert(
            5,
            Ship {
                id: 5,
                system_id: 1,
                ..Ship::default()
            },
        );
        st.ship_orders.insert(
            5,
            ShipOrders {
                queue: vec![
                    Order::TravelViaJump { jump_point_id: 10 },
                    Order::WaitDays { days: 2 },
                    Order::TravelViaJump { jump_point_id: 12 },
                    // Not in system 3: ignored from here on.
                    Order::TravelViaJump { jump_point_id: 10 },
                ],
                ..ShipOrders::default()
            },
        );
        assert_eq!(predicted_nav_state(&st, 5), Some((3, Vec2::ZERO)));
    }
}
