//! A two-segment arm driven by motors, re-rooted at its tip halfway through.

use rigid_composer::*;

fn main() -> Result<()> {
    let mut world = PhysicsWorld::new(WorldConfig::zero_gravity());

    let base = world.create_part(Shape::cylinder(1.0, 0.5), CFrame::IDENTITY, PartProperties::new(5.0, 0.5))?;
    let upper = world.create_part(Shape::cuboid(3.0, 0.3, 0.3), CFrame::IDENTITY, PartProperties::default())?;
    let lower = world.create_part(Shape::cuboid(2.0, 0.3, 0.3), CFrame::IDENTITY, PartProperties::default())?;

    world.attach_with_constraint(
        base,
        upper,
        Box::new(MotorConstraint::new(DVec3::Y, 0.5)),
        CFrame::from_position(DVec3::Y * 0.25),
        CFrame::from_position(DVec3::new(-1.5, 0.0, 0.0)),
    )?;
    world.attach_with_constraint(
        upper,
        lower,
        Box::new(MotorConstraint::new(DVec3::Z, -1.0)),
        CFrame::from_position(DVec3::new(1.5, 0.0, 0.0)),
        CFrame::from_position(DVec3::new(-1.0, 0.0, 0.0)),
    )?;

    for tick in 0..240 {
        if tick == 120 {
            let tip = world.physical_of(lower)?;
            world.make_main_physical(tip)?;
            println!("re-rooted at the tip");
        }
        world.step(config::DEFAULT_TIME_STEP)?;
        if tick % 60 == 59 {
            let part = world.part(lower).ok_or(PhysicsError::UnknownPart(lower))?;
            println!("t={:.2}s tip at {:?}", world.elapsed_time(), part.position());
        }
    }

    let root = world.main_physical_of(base)?;
    println!("{} physicals in the arm tree", world.connected_physical_count(root)?);
    world.validate()
}
