use std::sync::Arc;

use approx::assert_relative_eq;
use glam::{DQuat, DVec3};
use rigid_composer::{
    CFrame, DragForce, FixedConstraint, MotorConstraint, PartId, PartProperties, PhysicsError, PhysicsWorld,
    RecordingObserver, Shape, VectorKind, WorldConfig,
};

fn make_world() -> PhysicsWorld {
    PhysicsWorld::new(WorldConfig::zero_gravity())
}

fn unit_cube(world: &mut PhysicsWorld, cframe: CFrame) -> PartId {
    world
        .create_part(Shape::cube(1.0), cframe, PartProperties::new(1.0, 0.5))
        .unwrap()
}

#[test]
fn test_unit_force_for_one_second() {
    let mut world = make_world();
    let cube = unit_cube(&mut world, CFrame::IDENTITY);
    let physical = world.physical_of(cube).unwrap();
    assert_relative_eq!(world.physical(physical).unwrap().mass(), 1.0);

    world.apply_force_at_center_of_mass(physical, DVec3::X).unwrap();
    world.step(1.0).unwrap();

    let body = world.physical(physical).unwrap();
    assert_relative_eq!(body.velocity().x, 1.0, epsilon = 1e-12);
    assert_relative_eq!(world.part(cube).unwrap().position().x, 0.5, epsilon = 1e-12);
    // accumulators are consumed by the tick
    assert_eq!(body.total_force(), DVec3::ZERO);
}

#[test]
fn test_free_fall_matches_closed_form() {
    let mut world = PhysicsWorld::default();
    let cube = unit_cube(&mut world, CFrame::from_position(DVec3::Y * 10.0));
    let physical = world.physical_of(cube).unwrap();

    let dt = 1.0 / 60.0;
    for _ in 0..60 {
        world.step(dt).unwrap();
    }

    let t = world.elapsed_time();
    assert_relative_eq!(t, 1.0, epsilon = 1e-12);
    assert_relative_eq!(world.physical(physical).unwrap().velocity().y, -9.81 * t, epsilon = 1e-9);
    assert_relative_eq!(world.part(cube).unwrap().position().y, 10.0 - 0.5 * 9.81 * t * t, epsilon = 1e-9);
}

#[test]
fn test_symmetric_impulses_cancel_linear_motion() {
    let mut world = make_world();
    let cube = unit_cube(&mut world, CFrame::IDENTITY);
    let physical = world.physical_of(cube).unwrap();

    world.apply_impulse(physical, DVec3::X, DVec3::Y).unwrap();
    world.apply_impulse(physical, -DVec3::X, -DVec3::Y).unwrap();

    let body = world.physical(physical).unwrap();
    assert!(body.velocity().length() < 1e-12);
    // two unit angular impulses about Z against an inertia of 1/6
    assert_relative_eq!(body.angular_velocity().z, 12.0, epsilon = 1e-9);
    assert_relative_eq!(body.angular_velocity().x, 0.0, epsilon = 1e-12);
}

#[test]
fn test_impulse_at_center_sets_velocity_and_energy() {
    let mut world = make_world();
    let cube = unit_cube(&mut world, CFrame::IDENTITY);
    let physical = world.physical_of(cube).unwrap();

    world.apply_impulse_at_center_of_mass(physical, DVec3::new(0.0, 0.0, 2.0)).unwrap();
    assert_relative_eq!(world.physical(physical).unwrap().velocity().z, 2.0);
    assert_relative_eq!(world.kinetic_energy(physical).unwrap(), 2.0);
    assert_relative_eq!(
        world.velocity_of_point(physical, DVec3::X).unwrap().z,
        2.0,
        epsilon = 1e-12
    );
}

#[test]
fn test_refresh_is_idempotent() {
    let mut world = make_world();
    let parts: Vec<PartId> = (0..4)
        .map(|i| unit_cube(&mut world, CFrame::from_position(DVec3::X * i as f64)))
        .collect();
    for pair in parts.windows(2) {
        world
            .attach_with_constraint(
                pair[0],
                pair[1],
                Box::new(FixedConstraint::new()),
                CFrame::new(DVec3::new(0.5, 0.2, 0.0), DQuat::from_rotation_z(0.3)),
                CFrame::from_position(DVec3::new(-0.5, 0.0, 0.1)),
            )
            .unwrap();
    }
    let root = world.main_physical_of(parts[0]).unwrap();

    world.full_refresh_of_connected_physicals(root).unwrap();
    let first: Vec<CFrame> = parts.iter().map(|&p| *world.part(p).unwrap().cframe()).collect();
    world.full_refresh_of_connected_physicals(root).unwrap();
    let second: Vec<CFrame> = parts.iter().map(|&p| *world.part(p).unwrap().cframe()).collect();
    assert_eq!(first, second);
}

#[test]
fn test_connected_tree_falls_without_spinning() {
    let mut world = PhysicsWorld::default();
    let a = unit_cube(&mut world, CFrame::IDENTITY);
    let b = world
        .create_part(Shape::cuboid(2.0, 1.0, 1.0), CFrame::IDENTITY, PartProperties::new(3.0, 0.5))
        .unwrap();
    world
        .attach_with_constraint(
            a,
            b,
            Box::new(FixedConstraint::new()),
            CFrame::from_position(DVec3::new(1.5, 0.0, 0.0)),
            CFrame::from_position(DVec3::new(-1.0, 0.0, 0.0)),
        )
        .unwrap();

    let relative_before = world.part(a).unwrap().cframe().global_to_local(world.part(b).unwrap().cframe());
    for _ in 0..30 {
        world.step(1.0 / 60.0).unwrap();
    }

    let pa = world.physical_of(a).unwrap();
    let pb = world.physical_of(b).unwrap();
    assert!(world.physical(pa).unwrap().angular_velocity().length() < 1e-9);
    assert_relative_eq!(
        world.physical(pa).unwrap().velocity().y,
        world.physical(pb).unwrap().velocity().y,
        epsilon = 1e-9
    );
    let relative_after = world.part(a).unwrap().cframe().global_to_local(world.part(b).unwrap().cframe());
    assert!(relative_before.approx_eq(&relative_after, 1e-9));
}

#[test]
fn test_force_on_child_moves_whole_tree() {
    let mut world = make_world();
    let a = unit_cube(&mut world, CFrame::IDENTITY);
    let b = unit_cube(&mut world, CFrame::IDENTITY);
    world
        .attach_with_constraint(
            a,
            b,
            Box::new(FixedConstraint::new()),
            CFrame::from_position(DVec3::X),
            CFrame::IDENTITY,
        )
        .unwrap();
    let child = world.physical_of(b).unwrap();
    let root = world.physical_of(a).unwrap();

    world.apply_force_at_center_of_mass(child, DVec3::Y * 2.0).unwrap();
    world.step(0.01).unwrap();

    // force at the child's center acts off the tree center and spins the tree
    let motorized = world.physical(root).unwrap().motorized().unwrap();
    assert_relative_eq!(motorized.motion().velocity.y, 0.01, epsilon = 1e-12);
    assert!(motorized.motion().angular_velocity.z > 0.0);
}

#[test]
fn test_child_motion_is_derived_from_tree() {
    let mut world = make_world();
    let a = unit_cube(&mut world, CFrame::IDENTITY);
    let b = unit_cube(&mut world, CFrame::IDENTITY);
    world
        .attach_with_constraint(
            a,
            b,
            Box::new(FixedConstraint::new()),
            CFrame::from_position(DVec3::X * 2.0),
            CFrame::IDENTITY,
        )
        .unwrap();
    let root = world.physical_of(a).unwrap();
    let child = world.physical_of(b).unwrap();

    world.apply_angular_impulse(root, DVec3::Z).unwrap();

    let tree_center = world.tree_center_of_mass(root).unwrap();
    assert_relative_eq!(tree_center.x, 1.0, epsilon = 1e-12);
    let omega = world.physical(root).unwrap().angular_velocity();
    // two unit cubes one unit from the center: 2·(1/6) + 2·1
    assert_relative_eq!(omega.z, 1.0 / (1.0 / 3.0 + 2.0), epsilon = 1e-9);

    let child_body = world.physical(child).unwrap();
    let expected = omega.cross(child_body.center_of_mass() - tree_center);
    assert!((child_body.velocity() - expected).length() < 1e-12);
    assert_eq!(child_body.angular_velocity(), omega);
}

#[test]
fn test_motor_turns_child_relative_to_base() {
    let mut world = make_world();
    let base = unit_cube(&mut world, CFrame::IDENTITY);
    let arm = world
        .create_part(Shape::cuboid(2.0, 0.2, 0.2), CFrame::IDENTITY, PartProperties::new(1.0, 0.5))
        .unwrap();
    world
        .attach_with_constraint(
            base,
            arm,
            Box::new(MotorConstraint::new(DVec3::Z, 1.0)),
            CFrame::from_position(DVec3::Y),
            CFrame::from_position(DVec3::new(-1.0, 0.0, 0.0)),
        )
        .unwrap();

    for _ in 0..10 {
        world.step(0.1).unwrap();
    }

    let base_frame = *world.part(base).unwrap().cframe();
    let arm_frame = *world.part(arm).unwrap().cframe();
    let relative = base_frame.global_to_local(&arm_frame);
    let (axis, angle) = relative.rotation.to_axis_angle();
    assert_relative_eq!(angle, 1.0, epsilon = 1e-9);
    assert_relative_eq!(axis.z, 1.0, epsilon = 1e-9);
    // the arm's center sits one unit out from the joint
    let expected = DVec3::Y + DQuat::from_rotation_z(1.0) * DVec3::X;
    assert!((relative.position - expected).length() < 1e-9);

    let arm_physical = world.physical(world.physical_of(arm).unwrap()).unwrap();
    assert_relative_eq!(arm_physical.angular_velocity().z, 1.0, epsilon = 1e-9);
}

#[test]
fn test_observer_sees_applied_vectors() {
    let mut world = make_world();
    let observer = Arc::new(RecordingObserver::new());
    world.set_observer(Arc::clone(&observer));

    let cube = unit_cube(&mut world, CFrame::from_position(DVec3::Z));
    let physical = world.physical_of(cube).unwrap();
    world.apply_force(physical, DVec3::X, DVec3::Y).unwrap();
    world.apply_impulse_at_center_of_mass(physical, DVec3::X).unwrap();

    let records = observer.drain();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].kind, VectorKind::Force);
    assert_eq!(records[0].origin, DVec3::new(1.0, 0.0, 1.0));
    assert_eq!(records[1].kind, VectorKind::Impulse);
    assert!(observer.is_empty());
}

#[test]
fn test_drag_slows_motion() {
    let mut world = make_world();
    world.force_registry.add_force(DragForce { drag_coefficient: 0.5 });
    let cube = unit_cube(&mut world, CFrame::IDENTITY);
    let physical = world.physical_of(cube).unwrap();
    world.apply_impulse_at_center_of_mass(physical, DVec3::X * 4.0).unwrap();

    for _ in 0..10 {
        world.step(1.0 / 60.0).unwrap();
    }
    let speed = world.physical(physical).unwrap().velocity().x;
    assert!(speed < 4.0 && speed > 0.0);
}

#[test]
fn test_effective_inertia_at_center_is_mass() {
    let mut world = make_world();
    let cube = world
        .create_part(Shape::cube(1.0), CFrame::from_position(DVec3::Y), PartProperties::new(3.0, 0.5))
        .unwrap();
    let inertia = world.effective_inertia_at(cube, DVec3::Y, DVec3::X).unwrap();
    assert_relative_eq!(inertia, 3.0, epsilon = 1e-12);

    // pushing a corner sideways also spins the cube, so it feels lighter
    let corner = world.effective_inertia_at(cube, DVec3::new(0.5, 1.5, 0.5), DVec3::X).unwrap();
    assert!(corner < 3.0);
}

fn constrained_pair(world: &mut PhysicsWorld) -> (PartId, PartId) {
    let a = unit_cube(world, CFrame::from_rotation(DQuat::from_rotation_y(0.4)));
    let b = world
        .create_part(Shape::cuboid(1.0, 2.0, 1.0), CFrame::IDENTITY, PartProperties::new(1.5, 0.5))
        .unwrap();
    world
        .attach_with_constraint(
            a,
            b,
            Box::new(FixedConstraint::new()),
            CFrame::new(DVec3::new(0.5, 0.0, 0.0), DQuat::from_rotation_z(0.3)),
            CFrame::from_position(DVec3::new(-0.5, 0.5, 0.0)),
        )
        .unwrap();
    (a, b)
}

#[test]
fn test_effective_inertia_uses_whole_tree() {
    let mut world = make_world();
    let a = unit_cube(&mut world, CFrame::IDENTITY);
    let b = unit_cube(&mut world, CFrame::IDENTITY);
    world
        .attach_with_constraint(
            a,
            b,
            Box::new(FixedConstraint::new()),
            CFrame::from_position(DVec3::X),
            CFrame::IDENTITY,
        )
        .unwrap();

    // 1/2 + 0.5²/(5/6) along Y at b's center
    let center_b = world.part(b).unwrap().center_of_mass();
    let inertia = world.effective_inertia_at(b, center_b, DVec3::Y).unwrap();
    assert_relative_eq!(inertia, 1.25, epsilon = 1e-12);

    let pb = world.physical_of(b).unwrap();
    world.apply_impulse_at_center_of_mass(pb, DVec3::Y).unwrap();
    assert_relative_eq!(world.physical(pb).unwrap().velocity().y, 0.8, epsilon = 1e-12);
}

#[test]
fn test_effective_inertia_predicts_impulse_response() {
    let mut world = make_world();
    let (a, b) = constrained_pair(&mut world);
    let pb = world.physical_of(b).unwrap();
    let direction = DVec3::new(0.3, 1.0, -0.5).normalize();

    for part in [a, b] {
        let physical = world.physical_of(part).unwrap();
        let offset = DVec3::new(0.2, -0.4, 0.45);
        let point = world.physical(physical).unwrap().center_of_mass() + offset;

        let inertia = world.effective_inertia_at(part, point, direction).unwrap();
        let matrix = world.point_acceleration_matrix_at(part, point).unwrap();
        let before = world.velocity_of_point(physical, offset).unwrap();
        world.apply_impulse(physical, offset, direction).unwrap();
        let change = world.velocity_of_point(physical, offset).unwrap() - before;

        assert_relative_eq!(direction.dot(change), 1.0 / inertia, epsilon = 1e-9);
        assert!((matrix * direction - change).length() < 1e-9);
    }
    assert!(world.physical(pb).unwrap().angular_velocity().length() > 0.0);
}

#[test]
fn test_acceleration_of_point_predicts_step() {
    let mut world = make_world();
    let (_, b) = constrained_pair(&mut world);
    let pb = world.physical_of(b).unwrap();
    let offset = DVec3::new(0.0, 0.5, 0.25);

    world.apply_force(pb, DVec3::new(0.1, 0.0, 0.0), DVec3::new(0.0, 2.0, 1.0)).unwrap();
    world.apply_moment(pb, DVec3::X * 0.5).unwrap();
    let predicted = world.acceleration_of_point(pb, offset).unwrap();

    let dt = 1e-4;
    world.step(dt).unwrap();
    let measured = world.velocity_of_point(pb, offset).unwrap() / dt;
    assert!(
        (predicted - measured).length() < 1e-5 * predicted.length(),
        "predicted {predicted:?}, measured {measured:?}"
    );
}

#[test]
fn test_tree_kinetic_energy_sums_members() {
    let mut world = make_world();
    let (a, b) = constrained_pair(&mut world);
    let root = world.main_physical_of(a).unwrap();
    let pb = world.physical_of(b).unwrap();

    world.apply_impulse_at_center_of_mass(pb, DVec3::X).unwrap();
    world.apply_angular_impulse(root, DVec3::Z).unwrap();

    let total = world.tree_kinetic_energy(pb).unwrap();
    let members = world.kinetic_energy(root).unwrap() + world.kinetic_energy(pb).unwrap();
    assert_relative_eq!(total, members, epsilon = 1e-12);

    // rigid composite: ½ M |v|² + ½ ωᵀ I ω about the tree center
    let tree = world.physical(root).unwrap().motorized().unwrap();
    let frame = *world.physical(root).unwrap().cframe();
    let motion = tree.motion();
    let local_omega = frame.relative_to_local(motion.angular_velocity);
    let expected = 0.5 * tree.total_mass() * motion.velocity.length_squared()
        + 0.5 * local_omega.dot(tree.total_inertia() * local_omega);
    assert_relative_eq!(total, expected, epsilon = 1e-9);
}

#[test]
fn test_stale_handles_are_rejected() {
    let mut world = make_world();
    let cube = unit_cube(&mut world, CFrame::IDENTITY);
    let physical = world.physical_of(cube).unwrap();
    world.remove_part(cube).unwrap();

    assert!(matches!(
        world.apply_force_at_center_of_mass(physical, DVec3::X),
        Err(PhysicsError::UnknownPhysical(_))
    ));
    assert!(world.step(0.1).is_ok());
}

#[cfg(feature = "parallel")]
#[test]
fn test_parallel_step_matches_sequential() {
    fn build(parallel: bool) -> (PhysicsWorld, Vec<PartId>) {
        let mut world = PhysicsWorld::new(WorldConfig {
            parallel,
            ..WorldConfig::default()
        });
        let parts: Vec<PartId> = (0..16)
            .map(|i| unit_cube(&mut world, CFrame::from_position(DVec3::new(i as f64 * 2.0, 0.0, 0.0))))
            .collect();
        for (i, &part) in parts.iter().enumerate() {
            let physical = world.physical_of(part).unwrap();
            world
                .apply_impulse(physical, DVec3::new(0.0, 0.5, 0.0), DVec3::new(i as f64, 0.0, 1.0))
                .unwrap();
        }
        (world, parts)
    }

    let (mut sequential, parts) = build(false);
    let (mut parallel, _) = build(true);
    for _ in 0..20 {
        sequential.step(1.0 / 60.0).unwrap();
        parallel.step(1.0 / 60.0).unwrap();
    }
    for &part in &parts {
        assert_eq!(sequential.part(part).unwrap().cframe(), parallel.part(part).unwrap().cframe());
    }
}
