use tread_kinematics::*;

fn main() {
    let dt = 0.05; // Time step in seconds
    let leg_steps = 40; // 2 s per leg at 1 m/s
    let turn_steps = 20; // 1 s per quarter turn

    let forward = Twist::new(1.0, 0.0);
    let turn = Twist::new(0.0, core::f64::consts::FRAC_PI_2);

    let mut pose = Pose::default();
    println!("Initial Pose: {}", pose);

    for leg in 0..4 {
        for _ in 0..leg_steps {
            pose = integrate(pose, forward, dt);
        }
        for _ in 0..turn_steps {
            pose = integrate(pose, turn, dt);
        }
        println!("Leg {}: Pose: {}", leg + 1, pose);
    }

    println!("\nFinal Pose: {:?}", pose);
}
