//! Projectile Systems
//!
//! Ranged attacks spawn a projectile entity that travels in a straight line
//! along the attacker's facing. A projectile stops for good when its next
//! position would overlap a solid tile, or after striking exactly one target.
//! Stopped projectiles are despawned at the end of the combat phase.

use bevy::prelude::*;

use super::components::*;
use super::geometry::{Aabb, Facing};
use super::map::{CurrentLevel, LevelMap};
use crate::combat::log::{CombatLog, CombatLogEventType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileState {
    Flying,
    /// Stopped by a solid tile, left in place
    Blocked,
    /// Hit a target
    Spent,
}

#[derive(Component, Debug, Clone)]
pub struct Projectile {
    pub owner: Entity,
    /// Top-left corner in pixels
    pub position: Vec2,
    pub direction: Facing,
    /// Pixels per tick
    pub speed: f32,
    pub size: Vec2,
    pub damage: i32,
    pub state: ProjectileState,
}

impl Projectile {
    /// A projectile centered on `origin`.
    pub fn centered(owner: Entity, origin: Vec2, direction: Facing, speed: f32, size: f32, damage: i32) -> Self {
        let size = Vec2::splat(size);
        Self {
            owner,
            position: origin - size * 0.5,
            direction,
            speed,
            size,
            damage,
            state: ProjectileState::Flying,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.position, self.size)
    }

    pub fn is_alive(&self) -> bool {
        self.state == ProjectileState::Flying
    }

    /// Move one tick forward, or block in place if the next position touches
    /// a solid tile.
    pub fn advance(&mut self, map: &dyn LevelMap) {
        if !self.is_alive() {
            return;
        }
        let next = self.bounds().translated(self.direction.unit() * self.speed);
        if map.is_area_solid(&next) {
            self.state = ProjectileState::Blocked;
        } else {
            self.position = next.min;
        }
    }

    /// Mark the projectile spent and return the damage it carries.
    pub fn strike(&mut self) -> i32 {
        self.state = ProjectileState::Spent;
        self.damage
    }
}

pub fn move_projectiles(level: Res<CurrentLevel>, mut projectiles: Query<&mut Projectile>) {
    for mut projectile in projectiles.iter_mut() {
        projectile.advance(level.map.as_ref());
    }
}

/// Each flying projectile damages at most one live hostile it overlaps.
pub fn process_projectile_hits(
    mut combat_log: ResMut<CombatLog>,
    mut projectiles: Query<&mut Projectile>,
    mut targets: Query<(Entity, &mut Combatant), (Or<(With<Enemy>, With<Boss>)>, Without<Player>)>,
) {
    for mut projectile in projectiles.iter_mut() {
        if !projectile.is_alive() {
            continue;
        }
        let bounds = projectile.bounds();

        for (target_entity, mut target) in targets.iter_mut() {
            if target_entity == projectile.owner || !target.is_alive() || !bounds.intersects(&target.bounds()) {
                continue;
            }
            let damage = projectile.strike();
            let dealt = target.take_damage(damage);
            combat_log.log(
                CombatLogEventType::Damage,
                format!("Projectile hits {} for {} damage", target.name, dealt),
            );
            break;
        }
    }
}

pub fn purge_spent_projectiles(mut commands: Commands, projectiles: Query<(Entity, &Projectile)>) {
    for (entity, projectile) in projectiles.iter() {
        if !projectile.is_alive() {
            commands.entity(entity).despawn();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::map::{TileGrid, WALL};

    fn projectile_at(x: f32, y: f32, speed: f32) -> Projectile {
        Projectile {
            owner: Entity::PLACEHOLDER,
            position: Vec2::new(x, y),
            direction: Facing::Right,
            speed,
            size: Vec2::splat(4.0),
            damage: 7,
            state: ProjectileState::Flying,
        }
    }

    #[test]
    fn test_blocked_by_wall_stays_in_place() {
        let mut grid = TileGrid::open(5, 3, 32.0);
        for y in 0..3 {
            grid.set(2, y, WALL);
        }
        let mut projectile = projectile_at(63.0, 0.0, 5.0);

        projectile.advance(&grid);

        assert_eq!(projectile.position, Vec2::new(63.0, 0.0));
        assert!(!projectile.is_alive());
        assert_eq!(projectile.state, ProjectileState::Blocked);
    }

    #[test]
    fn test_open_map_moves_by_speed() {
        let grid = TileGrid::open(10, 10, 32.0);
        let mut projectile = projectile_at(10.0, 20.0, 5.0);

        projectile.advance(&grid);

        assert_eq!(projectile.position, Vec2::new(15.0, 20.0));
        assert!(projectile.is_alive());
    }

    #[test]
    fn test_leaving_the_map_blocks() {
        let grid = TileGrid::open(2, 2, 32.0);
        let mut projectile = projectile_at(58.0, 10.0, 5.0);
        projectile.advance(&grid);
        assert_eq!(projectile.state, ProjectileState::Blocked);
    }

    #[test]
    fn test_strike_spends_projectile() {
        let mut projectile = projectile_at(0.0, 0.0, 1.0);
        assert_eq!(projectile.strike(), 7);
        assert_eq!(projectile.state, ProjectileState::Spent);

        let grid = TileGrid::open(4, 4, 32.0);
        projectile.advance(&grid);
        assert_eq!(projectile.position, Vec2::ZERO);
    }

    #[test]
    fn test_centered_spawn() {
        let projectile = Projectile::centered(Entity::PLACEHOLDER, Vec2::new(50.0, 50.0), Facing::Up, 4.0, 6.0, 3);
        assert_eq!(projectile.bounds().center(), Vec2::new(50.0, 50.0));
    }
}
