//! Welds a stack of blocks into one physical and drops it under gravity.

use rigid_composer::*;

fn main() -> Result<()> {
    let mut world = PhysicsWorld::default();

    let base = world.create_part(
        Shape::cuboid(2.0, 0.5, 2.0),
        CFrame::from_position(DVec3::new(0.0, 20.0, 0.0)),
        PartProperties::new(2.0, 0.6),
    )?;
    for level in 1..=5 {
        let block = world.create_part(Shape::cube(1.0), CFrame::IDENTITY, PartProperties::default())?;
        let placement = CFrame::new(
            DVec3::new(0.0, 0.75 * level as f64, 0.0),
            DQuat::from_rotation_y(0.2 * level as f64),
        );
        world.attach(base, block, placement)?;
    }

    let tower = world.physical_of(base)?;
    let body = world.physical(tower).ok_or(PhysicsError::UnknownPhysical(tower))?;
    println!(
        "tower: {} parts, mass {:.2}, center of mass {:?}",
        body.part_count(),
        body.mass(),
        body.local_center_of_mass()
    );

    // knock it sideways near the top
    world.apply_impulse(tower, DVec3::new(0.0, 2.0, 0.0), DVec3::new(1.0, 0.0, 0.0))?;

    for tick in 0..120 {
        world.step(config::DEFAULT_TIME_STEP)?;
        if tick % 30 == 29 {
            let part = world.part(base).ok_or(PhysicsError::UnknownPart(base))?;
            println!(
                "t={:.2}s base at {:?}, energy {:.3}",
                world.elapsed_time(),
                part.position(),
                world.kinetic_energy(tower)?
            );
        }
    }

    world.validate()
}
