mod config;
mod sim;

use std::time::Duration;

use anyhow::Context;
use spin_sleep::SpinSleeper;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vela_kinematics::Pose2d;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let settings = config::load_config().context("loading configuration")?;
    let parameters = settings.robot.parameters();
    info!(
        robot = ?settings.robot,
        max_speed = parameters.max_drive_speed(),
        max_acceleration = parameters.max_drive_acceleration(),
        "Starting simulated swerve drive"
    );

    let mut rig = sim::SimRig::new(parameters).context("building drive subsystem")?;
    rig.swerve.reset_position(Pose2d::default());

    let period = Duration::from_secs_f64(settings.loop_period);
    let sleeper = SpinSleeper::default();
    let cycles = (settings.run_duration / settings.loop_period) as u64;

    let mut now = 0.0;
    for cycle in 0..cycles {
        now += settings.loop_period;
        rig.step(settings.loop_period);
        rig.swerve.periodic(now);

        // Scripted demo: drive a field-relative arc, then inject one vision
        // correction partway through to show the estimator pulling the pose.
        let t = cycle as f64 * settings.loop_period;
        if t < 2.0 {
            rig.swerve.drive(1.0, 0.0, 0.0, true);
        } else if t < 4.0 {
            rig.swerve.drive(0.0, 0.5, 0.4, true);
        } else {
            rig.swerve.drive(-0.5, 0.0, -0.4, true);
        }

        if cycle == cycles / 2 {
            let pose = rig.swerve.position();
            let measurement = Pose2d::new(pose.x + 0.3, pose.y - 0.2, pose.theta);
            info!(%measurement, "Injecting vision measurement");
            rig.swerve.add_vision_measurement(measurement, now - 0.1);
        }

        if cycle % 25 == 0 {
            let pose = rig.swerve.position();
            info!(
                pose = %pose,
                orientation = rig.swerve.orientation(),
                error = rig.swerve.has_error(),
                "cycle"
            );
        }

        sleeper.sleep(period);
    }

    rig.swerve.stop();
    info!(final_pose = %rig.swerve.position(), "Demo finished");
    Ok(())
}
