//! Simple planning factor publisher test
//!
//! Publishes a synthetic factor batch once a second, for checking subscribers
//! without running the full planning executable.

use chrono::Utc;
use nalgebra::Vector3;
use structopt::StructOpt;

use planning_if::{
    factor::{
        factor_topic, ControlPoint, PlanningFactor, PlanningFactorArray, SafetyFactorArray,
        FRAME_ID,
    },
    net::{topic_message, MonitoredSocket, SocketOptions},
    pose::Pose,
};

/// Command line options for the test publisher
#[derive(Debug, StructOpt)]
#[structopt(name = "test_factor_pub")]
struct Opts {
    /// Endpoint to bind the publisher to
    #[structopt(long, default_value = "tcp://*:5040")]
    endpoint: String,

    /// Module name to publish under
    #[structopt(long, default_value = "obstacle_stop")]
    module: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts = Opts::from_args();

    // Create zmq context
    let ctx = zmq::Context::new();

    // Create socket options
    let socket_options = SocketOptions {
        bind: true,
        block_on_first_connect: false,
        ..Default::default()
    };

    // Create the socket
    let socket = MonitoredSocket::new(&ctx, zmq::PUB, socket_options, &opts.endpoint)?;

    println!("Factor publisher open on {}", opts.endpoint);

    let topic = factor_topic(&opts.module);
    let mut cycle = 0u64;

    loop {
        // Alternate between an empty batch and a single stop factor, so that
        // subscribers see both shapes
        let factors = if cycle % 2 == 0 {
            Vec::new()
        } else {
            vec![PlanningFactor {
                module: opts.module.clone(),
                is_driving_forward: true,
                control_points: vec![ControlPoint {
                    pose: Pose::from_position_and_heading(Vector3::new(25.0, 0.0, 0.0), 0.0),
                    velocity: 0.0,
                    shift_length: 0.0,
                    distance: 25.0,
                }],
                behavior: PlanningFactor::STOP,
                detail: "test factor".into(),
                safety_factors: SafetyFactorArray::default(),
            }]
        };

        let batch = PlanningFactorArray {
            frame_id: FRAME_ID.into(),
            stamp: Utc::now(),
            factors,
        };

        match serde_json::to_string(&batch) {
            Ok(json) => {
                if let Err(e) = socket.send(&topic_message(&topic, &json), 0) {
                    println!("Failed to send batch: {}", e);
                }
            }
            Err(e) => println!("Failed to serialise batch: {}", e),
        }

        cycle += 1;

        std::thread::sleep(std::time::Duration::from_millis(1000));
    }
}
